/// Unified Error Handling Module
///
/// One error type for the whole service, mapped onto the four HTTP
/// outcomes the API can produce:
/// - `Unauthorized` (401): rejected credentials, failed token verification,
///   or a token that is no longer the one on record for its subject
/// - `Forbidden` (403): valid and current token, missing privileges
/// - `BadRequest` / `Validation` (400): structurally invalid input
/// - `Internal` (500): downstream collaborator failure; generic message to
///   the caller, full detail in the logs

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(msg) => write!(f, "{} has invalid format", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Central application error type
#[derive(Debug)]
pub enum AppError {
    /// Credentials rejected or token not valid/current for its subject.
    /// The optional detail is for the logs, not the caller.
    Unauthorized(Option<String>),
    /// Token is valid and current but the privilege set is insufficient.
    Forbidden { missing: Vec<String> },
    /// Structurally invalid input: malformed token on logout, unknown
    /// email on recovery, bad status name.
    BadRequest(String),
    Validation(ValidationError),
    /// Downstream collaborator failure; detail stays internal.
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized(Some(msg)) => write!(f, "unauthorized: {}", msg),
            AppError::Unauthorized(None) => write!(f, "unauthorized"),
            AppError::Forbidden { missing } => {
                write!(f, "missing privileges: {}", missing.join(", "))
            }
            AppError::BadRequest(msg) => write!(f, "{}", msg),
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

/// Error response body for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for log correlation
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Stable error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    /// Caller-facing message. Internal detail is replaced by a generic
    /// message; the full error goes to the logs via `log_error`.
    fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized(_) => "unauthorized".to_string(),
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden { .. } => "FORBIDDEN",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn log_error(&self, error_id: &str) {
        match self {
            AppError::Unauthorized(_) => {
                tracing::warn!(error_id = error_id, error = %self, "Authorization rejected");
            }
            AppError::Forbidden { .. } => {
                tracing::warn!(error_id = error_id, error = %self, "Insufficient privileges");
            }
            AppError::BadRequest(_) | AppError::Validation(_) => {
                tracing::warn!(error_id = error_id, error = %self, "Invalid request");
            }
            AppError::Internal(_) => {
                tracing::error!(error_id = error_id, error = %self, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&error_id);

        let status = self.status_code();
        let body = ErrorResponse::new(
            error_id,
            self.public_message(),
            self.code().to_string(),
            status.as_u16(),
        );

        HttpResponse::build(status).json(body)
    }
}
