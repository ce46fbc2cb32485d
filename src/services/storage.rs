use crate::utils::hash;
use async_trait::async_trait;
use std::io::{self, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;

/// Digest and size measured from a file at its permanent location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedFile {
    pub sha256: String,
    pub bytes: i64,
}

/// Key of the partial file that receives an upload's chunks.
pub fn partial_key(upload_id: Uuid) -> String {
    format!("uploads/{upload_id}")
}

/// Key of a published file. `file_dir` is unique per artifact, so nothing published is
/// ever overwritten.
pub fn segment_file_key(segment_id: Uuid, file_dir: Uuid, filename: &str) -> String {
    format!("segments/{segment_id}/{file_dir}/{filename}")
}

/// Backing store for partial and published files. Keys are paths relative to the store root.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Writes `data` at `offset`, creating the file and its parents if needed.
    ///
    /// Bytes past the written range are left alone. Either all of `data` is durably written
    /// or an error is returned.
    async fn write_chunk(&self, key: &str, data: &[u8], offset: u64) -> io::Result<u64>;

    /// Moves a partial file to `dest_key`, then measures digest and size at the destination.
    /// The move is a rename, never a copy.
    async fn finalize(&self, partial_key: &str, dest_key: &str) -> io::Result<FinalizedFile>;

    /// Moves a finalized file back to its partial location.
    async fn restore(&self, dest_key: &str, partial_key: &str) -> io::Result<()>;

    /// Writes a whole file in one go and measures it.
    async fn write_file(&self, key: &str, data: &[u8]) -> io::Result<FinalizedFile>;

    /// Removes a file. Missing files are not an error.
    async fn delete_file(&self, key: &str) -> io::Result<()>;

    async fn health_check(&self) -> io::Result<()>;
}

/// Single-node filesystem store rooted at one directory.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key to an absolute path. Keys that are absolute or contain `..` are refused.
    pub fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !plain {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("storage key escapes the storage root: {key:?}"),
            ));
        }
        Ok(self.root.join(relative))
    }

    pub async fn file_exists(&self, key: &str) -> io::Result<bool> {
        let path = self.resolve(key)?;
        fs::try_exists(&path).await
    }
}

async fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn measure(path: &Path) -> io::Result<FinalizedFile> {
    let bytes = fs::metadata(path).await?.len() as i64;
    let sha256 = hash::digest_file(path).await?;
    Ok(FinalizedFile { sha256, bytes })
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn write_chunk(&self, key: &str, data: &[u8], offset: u64) -> io::Result<u64> {
        let path = self.resolve(key)?;
        ensure_parent(&path).await?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        let written = async {
            file.seek(SeekFrom::Start(offset)).await?;
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;

        if let Err(err) = written {
            // Drop whatever part of the range made it to disk
            if let Err(rollback) = file.set_len(offset).await {
                tracing::warn!(
                    "Failed to roll back partial write to {:?} at offset {}: {}",
                    path,
                    offset,
                    rollback
                );
            }
            return Err(err);
        }

        Ok(data.len() as u64)
    }

    async fn finalize(&self, partial_key: &str, dest_key: &str) -> io::Result<FinalizedFile> {
        let partial = self.resolve(partial_key)?;
        let dest = self.resolve(dest_key)?;
        ensure_parent(&dest).await?;

        fs::rename(&partial, &dest).await?;

        match measure(&dest).await {
            Ok(finalized) => Ok(finalized),
            Err(err) => {
                if let Err(undo) = fs::rename(&dest, &partial).await {
                    tracing::error!(
                        "Could not move {:?} back to {:?} after failed verification: {}",
                        dest,
                        partial,
                        undo
                    );
                }
                Err(err)
            }
        }
    }

    async fn restore(&self, dest_key: &str, partial_key: &str) -> io::Result<()> {
        let dest = self.resolve(dest_key)?;
        let partial = self.resolve(partial_key)?;
        ensure_parent(&partial).await?;
        fs::rename(&dest, &partial).await
    }

    async fn write_file(&self, key: &str, data: &[u8]) -> io::Result<FinalizedFile> {
        let path = self.resolve(key)?;
        ensure_parent(&path).await?;

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_data().await?;
        drop(file);

        measure(&path).await
    }

    async fn delete_file(&self, key: &str) -> io::Result<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn health_check(&self) -> io::Result<()> {
        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("storage root {:?} is not a directory", self.root),
            ));
        }
        Ok(())
    }
}
