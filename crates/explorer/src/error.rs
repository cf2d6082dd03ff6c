use tracity_client::ApiError;
use tracity_core::ValidationError;

/// Failures reading or writing the persisted session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisted session is corrupt: {0}")]
    Corrupt(String),
}

/// An insight payload matched none of the known wire shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("unrecognized insight payload: {0}")]
    UnknownShape(String),

    #[error("fallback template failed: {0}")]
    Template(String),
}

/// Errors from user-initiated actions (login, upload) that are shown to
/// the user instead of degrading into fallback content.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<ValidationError> for ExplorerError {
    fn from(e: ValidationError) -> Self {
        ExplorerError::Api(ApiError::Validation(e))
    }
}

impl ExplorerError {
    /// User-facing text; `fallback` covers rejections without a detail.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ExplorerError::Api(e) => e.user_message(fallback),
            ExplorerError::Session(e) => e.to_string(),
        }
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, ExplorerError::Api(e) if e.requires_login())
    }
}
