use std::path::Path;

use crate::error::ValidationError;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["csv", "json"];

/// A file queued for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Extension-derived type: "csv" or "json".
    pub fn file_type(&self) -> Option<String> {
        extension(&self.filename)
    }

    pub fn mime_type(&self) -> &'static str {
        match self.file_type().as_deref() {
            Some("json") => "application/json",
            _ => "text/csv",
        }
    }

    pub fn validate(&self, max_bytes: u64) -> Result<(), ValidationError> {
        validate_upload(&self.filename, self.size(), max_bytes)
    }
}

/// Check type and size before any network call is made.
pub fn validate_upload(filename: &str, size: u64, max_bytes: u64) -> Result<(), ValidationError> {
    match extension(filename) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => {
            return Err(ValidationError::DisallowedType {
                filename: filename.to_string(),
            })
        }
    }
    if size > max_bytes {
        return Err(ValidationError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    Ok(())
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
