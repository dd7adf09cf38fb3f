use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Transport failure or a server error without a more specific meaning.
    Network,
    Unauthorized,
    NotFound,
    /// Optimistic-concurrency or scheduling conflict (HTTP 409).
    Conflict,
    /// The resource is locked while its precondition holds (HTTP 423).
    Locked,
    Validation,
    /// The server answered with a body that could not be understood.
    Decode,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            404 => Self::NotFound,
            409 => Self::Conflict,
            422 | 400 => Self::Validation,
            423 => Self::Locked,
            _ => Self::Network,
        }
    }

    /// Only transport failures are worth another attempt without asking the
    /// user first; conflicts and locks must never be retried blindly.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network)
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.code == ErrorCode::Conflict
    }

    pub fn is_locked(&self) -> bool {
        self.code == ErrorCode::Locked
    }
}

/// Error body returned by the paper service. Older endpoints use `message`
/// instead of `detail`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.detail
            .or(self.message)
            .filter(|message| !message.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_onto_failure_taxonomy() {
        assert_eq!(ErrorCode::from_status(409), ErrorCode::Conflict);
        assert_eq!(ErrorCode::from_status(423), ErrorCode::Locked);
        assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
        assert_eq!(ErrorCode::from_status(500), ErrorCode::Network);
        assert!(!ErrorCode::Conflict.is_retryable());
        assert!(!ErrorCode::Locked.is_retryable());
    }

    #[test]
    fn error_body_prefers_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail":"version mismatch","message":"other"}"#)
                .expect("json");
        assert_eq!(body.into_message().as_deref(), Some("version mismatch"));
        let blank: ErrorBody = serde_json::from_str(r#"{"detail":"  "}"#).expect("json");
        assert_eq!(blank.into_message(), None);
    }
}
