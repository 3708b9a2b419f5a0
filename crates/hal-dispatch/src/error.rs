use thiserror::Error;

pub const AUTHENTICATION_REQUIRED: &str = "Authentication required.";
pub const SERVICE_UNAVAILABLE: &str = "Service temporarily unavailable. Is the server still booting?";
pub const UNEXPECTED_STATUS: &str = "Unexpected status code.";

/// Transport-level problems, delivered through the exception channel.
///
/// These never describe a failed management operation; those are reported as
/// failures with the server's failure description instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Communication error.")]
    Communication { detail: String },
    #[error("Request timed out after {timeout_ms} ms.")]
    Timeout { timeout_ms: u64 },
    #[error("Request cancelled.")]
    Cancelled,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl DispatchError {
    /// HTTP status of the response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Maps a non-200 status to its exception; `None` means the body should be decoded.
pub fn classify_status(status: u16, url: &str) -> Option<DispatchError> {
    let message = match status {
        200 => return None,
        0 | 401 | 403 => AUTHENTICATION_REQUIRED.to_string(),
        404 => format!("Management interface at '{url}' not found."),
        503 => SERVICE_UNAVAILABLE.to_string(),
        _ => UNEXPECTED_STATUS.to_string(),
    };
    Some(DispatchError::Status { status, message })
}
