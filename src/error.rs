//! Error types for taskboard
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (blank fields, bad args, unknown ids, bad config)
//! - 3: Auth error (bad credentials, duplicate registration, no session)
//! - 4: Operation failed (backend unreachable, rejected write, I/O)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tb CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const AUTH_ERROR: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskboard operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Comment not found: {0}")]
    CommentNotFound(i64),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Auth errors (exit code 3)
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not signed in")]
    Unauthenticated,

    // Operation failures (exit code 4)
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::Validation(_)
            | Error::TaskNotFound(_)
            | Error::CommentNotFound(_)
            | Error::UserNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            // Auth errors
            Error::DuplicateEmail(_) | Error::InvalidCredentials | Error::Unauthenticated => {
                exit_codes::AUTH_ERROR
            }

            // Operation failures
            Error::Persistence(_)
            | Error::Http(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Stable snake_case name used in JSON error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::TaskNotFound(_) | Error::CommentNotFound(_) | Error::UserNotFound(_) => {
                "not_found"
            }
            Error::InvalidConfig(_) => "invalid_config",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::DuplicateEmail(_) => "duplicate_email",
            Error::InvalidCredentials => "invalid_credentials",
            Error::Unauthenticated => "unauthenticated",
            Error::Persistence(_)
            | Error::Http(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::LockFailed(_) => "persistence",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::TaskNotFound(id) => Some(serde_json::json!({ "task_id": id })),
            Error::CommentNotFound(id) => Some(serde_json::json!({ "comment_id": id })),
            Error::UserNotFound(user) => Some(serde_json::json!({ "user": user })),
            Error::DuplicateEmail(email) => Some(serde_json::json!({ "email": email })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for taskboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reject a required field that is blank after trimming.
pub(crate) fn require_non_blank<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{field} cannot be blank")));
    }
    Ok(trimmed)
}

/// The `error` object of a JSON error envelope
#[derive(serde::Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            message: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
