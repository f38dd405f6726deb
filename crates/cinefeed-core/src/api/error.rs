use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend answered 401. The session has already been cleared;
    /// `session_ended` tells whether there was one to clear.
    #[error("Unauthorized: {}", .message.as_deref().unwrap_or("please log in again"))]
    Unauthorized {
        message: Option<String>,
        session_ended: bool,
    },

    /// Any other non-success status, passed through untouched.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    /// No response was received.
    #[error("Could not reach server: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error payload shape used by the backend: `{ "message": "..." }`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The backend's `message` field, if the body carries one.
    fn backend_message(body: &str) -> Option<String> {
        match serde_json::from_str(body) {
            Ok(ErrorBody { message: Some(message) }) if !message.is_empty() => {
                Some(Self::truncate_body(&message))
            }
            _ => None,
        }
    }

    /// Prefer the backend's `message` field, fall back to the raw body.
    fn message_from_body(status: StatusCode, body: &str) -> String {
        if let Some(message) = Self::backend_message(body) {
            return message;
        }
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            Self::truncate_body(body)
        }
    }

    pub(crate) fn unauthorized(body: &str, session_ended: bool) -> Self {
        ApiError::Unauthorized {
            message: Self::backend_message(body),
            session_ended,
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::unauthorized(body, false),
            _ => ApiError::Rejected {
                status,
                message: Self::message_from_body(status, body),
            },
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// True when a 401 ended the session that sent the request.
    pub fn ended_session(&self) -> bool {
        matches!(self, ApiError::Unauthorized { session_ended: true, .. })
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Unreachable(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
