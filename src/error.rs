/// Unified error types for the announcement moderation service
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SQLite extended result code for a UNIQUE constraint violation
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ModerationError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Target record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors (bad input, duplicate keys)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Stale write detected by the version check
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModerationError {
    /// Short stable name used for metrics labels and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ModerationError::Database(_) => "database",
            ModerationError::NotFound(_) => "not_found",
            ModerationError::Validation(_) => "validation",
            ModerationError::Conflict(_) => "conflict",
            ModerationError::Config(_) => "config",
            ModerationError::Internal(_) => "internal",
            ModerationError::Io(_) => "io",
        }
    }

    /// Message safe to show to a moderator
    pub fn user_message(&self) -> String {
        match self {
            ModerationError::NotFound(what) => format!("{} not found", what),
            ModerationError::Validation(msg) => msg.clone(),
            ModerationError::Conflict(_) => {
                "This item was changed by another moderator. Refresh and try again.".to_string()
            }
            _ => "Moderation failed, please try again".to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ModerationError::NotFound(_) => StatusCode::NOT_FOUND,
            ModerationError::Validation(_) => StatusCode::BAD_REQUEST,
            ModerationError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Translate backend-specific database failures into the closed error kinds.
///
/// Every sqlx call whose failure needs to be told apart goes through here,
/// so SQLite result codes are never compared anywhere else.
pub fn classify_db_error(err: sqlx::Error, subject: &str) -> ModerationError {
    match err {
        sqlx::Error::RowNotFound => ModerationError::NotFound(subject.to_string()),
        sqlx::Error::Database(ref db_err)
            if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_UNIQUE)
                || db_err.is_unique_violation() =>
        {
            ModerationError::Validation(format!("{} already exists", subject))
        }
        other => ModerationError::Database(other),
    }
}

/// Malformed or mistyped request bodies are validation failures, so they
/// still answer with the `{ success, message }` shape
impl From<JsonRejection> for ModerationError {
    fn from(rejection: JsonRejection) -> Self {
        ModerationError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// Uniform `{ success, message }` shape returned to moderator UIs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(err: &ModerationError) -> Self {
        Self {
            success: false,
            message: err.user_message(),
        }
    }
}

/// Convert ModerationError to HTTP response
impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ModerationError::NotFound(_)
            | ModerationError::Validation(_)
            | ModerationError::Conflict(_) => {
                tracing::debug!(kind = self.kind(), "request rejected: {}", self)
            }
            _ => tracing::error!(kind = self.kind(), "request failed: {}", self),
        }

        (status, Json(ActionResult::failed(&self))).into_response()
    }
}

/// Result type alias for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;
