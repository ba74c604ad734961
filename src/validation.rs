//! Upload constraints checked before any pixel work.
//!
//! The container check (is this really a JPEG/PNG/WebP?) happens during
//! decode in the pipeline and reports [`ValidationError::InvalidImage`].

use crate::imaging::rust_backend::supported_input_extensions;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MIB: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    DisallowedExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

/// Per-context upload ceiling, in bytes of the raw upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLimits {
    pub max_upload_bytes: usize,
}

impl UploadLimits {
    pub fn from_mib(mib: usize) -> Self {
        Self {
            max_upload_bytes: mib * MIB,
        }
    }
}

/// Lowercased extension of `filename`, if it has one.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Check emptiness, extension and raw size, in that order.
pub fn validate_upload(
    filename: &str,
    bytes: &[u8],
    limits: UploadLimits,
) -> Result<(), ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }

    let extension = extension_of(filename)
        .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;
    let allowed = supported_input_extensions();
    if !allowed.contains(&extension.as_str()) {
        return Err(ValidationError::DisallowedExtension {
            extension,
            allowed: allowed.iter().map(|e| e.to_string()).collect(),
        });
    }

    if bytes.len() > limits.max_upload_bytes {
        return Err(ValidationError::TooLarge {
            size: bytes.len(),
            max: limits.max_upload_bytes,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> UploadLimits {
        UploadLimits::from_mib(5)
    }

    #[test]
    fn accepts_all_allowed_extensions_any_case() {
        for name in ["a.jpg", "b.JPEG", "c.Png", "d.webp"] {
            assert!(validate_upload(name, b"x", limits()).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_empty_upload_first() {
        assert!(matches!(
            validate_upload("photo.gif", b"", limits()),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn rejects_disallowed_extension() {
        match validate_upload("anim.gif", b"GIF89a", limits()) {
            Err(ValidationError::DisallowedExtension { extension, allowed }) => {
                assert_eq!(extension, "gif");
                assert!(allowed.contains(&"webp".to_string()));
            }
            other => panic!("expected DisallowedExtension, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_extension() {
        assert!(matches!(
            validate_upload("README", b"x", limits()),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let limits = UploadLimits {
            max_upload_bytes: 4,
        };
        assert!(validate_upload("a.png", &[0; 4], limits).is_ok());
        match validate_upload("a.png", &[0; 5], limits) {
            Err(ValidationError::TooLarge { size, max }) => {
                assert_eq!((size, max), (5, 4));
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn from_mib() {
        assert_eq!(UploadLimits::from_mib(10).max_upload_bytes, 10_485_760);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            ValidationError::TooLarge { size: 6, max: 5 }.to_string(),
            "File too large: 6 bytes (max: 5 bytes)"
        );
        assert_eq!(
            ValidationError::InvalidImage("truncated".into()).to_string(),
            "Invalid image: truncated"
        );
    }
}
