//! Key validation and hashing shared by the backends.

use sha2::{Digest, Sha256};
use temario_error::{StorageError, StorageErrorKind};

/// Reject keys that could escape the storage root.
///
/// Keys are relative, slash-separated and contain no empty, `.` or `..`
/// segments.
///
/// # Examples
///
/// ```
/// use temario_storage::validate_key;
///
/// assert!(validate_key("assistants/a/syllabus/tema-1/v1.pdf").is_ok());
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("/absolute").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad_segment = key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if key.is_empty() || key.contains('\\') || bad_segment {
        return Err(StorageError::new(StorageErrorKind::InvalidKey(key.to_string())));
    }
    Ok(())
}

/// SHA-256 of `data`, hex encoded.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
