use thiserror::Error;

/// Client-side rejection of a file before any upload is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Only CSV and JSON files are allowed")]
    DisallowedType { filename: String },

    #[error("File size must be less than {}MB", limit / (1024 * 1024))]
    TooLarge { size: u64, limit: u64 },
}
