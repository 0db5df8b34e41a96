//! Structured errors for the onboarding API client.
//!
//! Every failure below the workflow layer is an [`ApiError`], so callers can
//! branch on the HTTP status or the server's error code instead of matching
//! message text.
use std::fmt;
use thiserror::Error;

/// Structured error code the backend uses when a plan is requested for a
/// requirement set that has not been approved yet.
pub const NOT_APPROVED_CODE: &str = "requirement_set_not_approved";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    Upstream,
    Server,
    Client,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorKind::BadRequest,
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            502 | 504 => ErrorKind::Upstream,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Client,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Server => "server",
            ErrorKind::Client => "client",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("request to {path} timed out after {timeout_ms}ms")]
    Timeout { path: String, timeout_ms: u64 },

    #[error("request to {path} failed: {message}")]
    Network { path: String, message: String },

    #[error("HTTP {status} from {path}: {message}")]
    Status {
        status: u16,
        kind: ErrorKind,
        code: Option<String>,
        message: String,
        path: String,
    },

    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error(
        "requirement set {requirement_set_id} is locked (status {status}); create a new requirement set to modify"
    )]
    Locked {
        requirement_set_id: String,
        status: String,
    },

    #[error("cannot {action} requirement set {requirement_set_id} while it is {status}")]
    InvalidTransition {
        requirement_set_id: String,
        action: &'static str,
        status: String,
    },
}

impl ApiError {
    pub fn status(status: u16, code: Option<String>, message: String, path: &str) -> Self {
        ApiError::Status {
            status,
            kind: ErrorKind::from_status(status),
            code,
            message,
            path: path.to_string(),
        }
    }

    /// HTTP status code, when the error came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::Status { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Server-provided machine-readable error code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == Some(ErrorKind::Conflict)
    }

    /// True when the failure means "approve the requirement set first".
    pub fn is_not_approved(&self) -> bool {
        self.is_conflict() || self.code() == Some(NOT_APPROVED_CODE)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_keyed_off_status_code() {
        let err = ApiError::status(409, None, "anything".to_string(), "/api/deploy/plan");
        assert!(err.is_conflict());
        assert!(err.is_not_approved());
        assert_eq!(err.status_code(), Some(409));
    }

    #[test]
    fn not_approved_code_counts_without_409() {
        let err = ApiError::status(
            400,
            Some(NOT_APPROVED_CODE.to_string()),
            "requirement set must be approved".to_string(),
            "/api/deploy/plan",
        );
        assert!(!err.is_conflict());
        assert!(err.is_not_approved());
    }

    #[test]
    fn message_text_alone_is_not_a_conflict() {
        let err = ApiError::status(
            500,
            None,
            "409 not approved".to_string(),
            "/api/deploy/plan",
        );
        assert!(!err.is_not_approved());
        assert_eq!(err.kind(), Some(ErrorKind::Server));
    }

    #[test]
    fn display_embeds_status_and_path() {
        let err = ApiError::status(404, None, "Not Found".to_string(), "/runs/r1/outputs");
        assert_eq!(err.to_string(), "HTTP 404 from /runs/r1/outputs: Not Found");
    }
}
