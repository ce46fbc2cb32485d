use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Files are streamed through the hasher in blocks of this size.
pub const DIGEST_BLOCK_SIZE: usize = 1024 * 1024;

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

pub fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub async fn calculate_hash_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; DIGEST_BLOCK_SIZE];
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of a file's full contents as lowercase hex. Memory use does not grow with file size.
pub async fn digest_file(path: &Path) -> std::io::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    calculate_hash_from_reader(file).await
}

/// Canonical form of a client-declared digest: trimmed lowercase hex of the right length.
pub fn normalize_digest(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() != SHA256_HEX_LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

pub fn digests_match(declared: &str, computed: &str) -> bool {
    declared.trim().eq_ignore_ascii_case(computed.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_calculate_hash() {
        assert_eq!(calculate_hash(b"hello world"), HELLO_WORLD);
    }

    #[test]
    fn test_calculate_hash_empty() {
        // SHA-256 for empty string
        assert_eq!(
            calculate_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_calculate_hash_from_reader() {
        let data = b"hello world";
        let hash = calculate_hash_from_reader(&data[..]).await.unwrap();
        assert_eq!(hash, HELLO_WORLD);
    }

    #[tokio::test]
    async fn test_digest_file_spans_multiple_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.mp4");
        let data: Vec<u8> = (0..DIGEST_BLOCK_SIZE * 2 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        tokio::fs::write(&path, &data).await.unwrap();

        assert_eq!(digest_file(&path).await.unwrap(), calculate_hash(&data));
    }

    #[tokio::test]
    async fn test_digest_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = digest_file(&dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_normalize_digest() {
        let upper = HELLO_WORLD.to_ascii_uppercase();
        assert_eq!(normalize_digest(&upper).as_deref(), Some(HELLO_WORLD));
        assert_eq!(
            normalize_digest(&format!("  {HELLO_WORLD}\n")).as_deref(),
            Some(HELLO_WORLD)
        );
        assert!(normalize_digest("abc123").is_none());
        assert!(normalize_digest(&"z".repeat(64)).is_none());
    }

    #[test]
    fn test_digests_match_ignores_case() {
        assert!(digests_match(&HELLO_WORLD.to_ascii_uppercase(), HELLO_WORLD));
        assert!(!digests_match(HELLO_WORLD, &calculate_hash(b"hello")));
    }
}
