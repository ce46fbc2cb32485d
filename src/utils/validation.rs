use crate::utils::hash::{SHA256_HEX_LEN, normalize_digest};
use thiserror::Error;

/// Longest filename accepted, in bytes.
pub const MAX_FILENAME_BYTES: usize = 255;

#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Checks that a client-supplied filename is a single, plain path component.
///
/// The name becomes the last component of a path under the storage root, so anything that
/// could change the directory it lands in is rejected rather than rewritten.
pub fn validate_filename(filename: &str) -> Result<String, ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename cannot be empty",
        ));
    }

    if filename.len() > MAX_FILENAME_BYTES {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            format!("Filename exceeds {MAX_FILENAME_BYTES} bytes"),
        ));
    }

    if filename.contains('/') || filename.contains('\\') || filename == ".." {
        tracing::warn!("Path traversal attempt detected: {}", filename);
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename must not contain path separators",
        ));
    }

    if filename.chars().any(char::is_control) {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename must not contain control characters",
        ));
    }

    // Covers "." and hidden files
    if filename.starts_with('.') {
        return Err(ValidationError::new(
            "HIDDEN_FILE",
            "Hidden files (starting with '.') are not allowed",
        ));
    }

    Ok(filename.to_string())
}

/// Validates a declared SHA-256 and returns it in canonical lowercase form.
pub fn validate_digest(raw: &str) -> Result<String, ValidationError> {
    normalize_digest(raw).ok_or_else(|| {
        ValidationError::new(
            "INVALID_DIGEST",
            format!("sha256 must be {SHA256_HEX_LEN} hexadecimal characters"),
        )
    })
}

/// Validates a declared upload length against the configured maximum
pub fn validate_upload_length(length: i64, max_size: i64) -> Result<(), ValidationError> {
    if length <= 0 {
        return Err(ValidationError::new(
            "INVALID_LENGTH",
            "upload_length must be greater than zero",
        ));
    }
    if length > max_size {
        return Err(ValidationError::new(
            "FILE_TOO_LARGE",
            format!(
                "Upload length {} bytes exceeds maximum allowed {} bytes ({} MB)",
                length,
                max_size,
                max_size / 1024 / 1024
            ),
        ));
    }
    Ok(())
}
