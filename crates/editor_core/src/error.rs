use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("{}", .0.message)]
    Gateway(#[from] ApiError),
    #[error("No paper to publish")]
    NoPersistedPaper,
}

impl EditorError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            EditorError::Gateway(err) => Some(err.code),
            EditorError::NoPersistedPaper => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.code() == Some(ErrorCode::Conflict)
    }

    pub fn is_locked(&self) -> bool {
        self.code() == Some(ErrorCode::Locked)
    }
}
