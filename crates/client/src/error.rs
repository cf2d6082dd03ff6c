//! Failure taxonomy for remote calls.

use tracity_core::ValidationError;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, I/O).
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// An auth-required call was attempted without a credential.
    #[error("authentication required")]
    Unauthorized,

    /// Rejected locally before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A success status whose body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True for a missing credential or a 401/403 from the backend.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized | ApiError::Rejected { status: 401 | 403, .. }
        )
    }

    /// Message suitable for showing to a user, with a caller-chosen
    /// wording for rejections that carried no detail.
    pub fn user_message(&self, rejected_fallback: &str) -> String {
        match self {
            ApiError::Network(_) => "Network error. Please try again.".to_string(),
            ApiError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Rejected { .. } | ApiError::Decode(_) => rejected_fallback.to_string(),
            ApiError::Unauthorized => "Please log in to continue".to_string(),
            ApiError::Validation(e) => e.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Rejected {
                status: status.as_u16(),
                message: String::new(),
            }
        } else {
            ApiError::Network(e.to_string())
        }
    }
}
