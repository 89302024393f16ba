//! Pre-flight checks on an incoming file.
//!
//! Validation works purely on caller-declared metadata: there is no content sniffing, and
//! nothing here touches the network.

use thiserror::Error;

/// Default upper bound on upload size: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

const IMAGE_TYPE_PREFIX: &str = "image/";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No file provided")]
    MissingFile,

    #[error("Only image files are allowed")]
    InvalidType { declared: String },

    #[error("File size must be less than {}", limit_text(.limit))]
    TooLarge { size: u64, limit: u64 },
}

/// Human-readable size limit: whole megabytes when exact, one decimal place above 1 MiB,
/// plain bytes below.
pub fn format_size(bytes: u64) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= MIB {
        format!("{:.1}MB", bytes as f64 / MIB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn limit_text(limit: &u64) -> String {
    format_size(*limit)
}

/// Check a declared MIME type and byte length against the upload policy.
///
/// The type is checked before the size, so a non-image that is also oversized reports
/// `InvalidType`.
pub fn validate(declared_type: &str, size: u64, max_file_size: u64) -> Result<(), ValidationError> {
    check_type(declared_type)?;
    check_size(size, max_file_size)
}

pub fn check_type(declared_type: &str) -> Result<(), ValidationError> {
    if declared_type.starts_with(IMAGE_TYPE_PREFIX) {
        Ok(())
    } else {
        Err(ValidationError::InvalidType {
            declared: declared_type.to_string(),
        })
    }
}

pub fn check_size(size: u64, max_file_size: u64) -> Result<(), ValidationError> {
    if size > max_file_size {
        Err(ValidationError::TooLarge { size, limit: max_file_size })
    } else {
        Ok(())
    }
}
