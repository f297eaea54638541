
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::ordering::OrderingError;

pub type Result<T> = std::result::Result<T, TodoError>;

// SQLite result codes that signal a write collided with another writer.
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";
const SQLITE_BUSY_SNAPSHOT: &str = "517";
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    // Destination ordering collided with a concurrent write
    #[error("order conflict, retry with fresh state")]
    OrderConflict,

    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error("email already exists: {email}")]
    EmailTaken { email: String },

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("credential hashing failed")]
    Hashing,

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response {status}: {message}")]
    Unexpected { status: u16, message: String },
}

impl TodoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn todo_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            resource: "todo",
            id: id.to_string(),
        }
    }

    // Conflicts clear after re-reading state
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OrderConflict)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::Ordering(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::OrderConflict | Self::EmailTaken { .. } => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Hashing | Self::Database(_) | Self::Http(_) | Self::Unexpected { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for TodoError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let conflict = db_err.is_unique_violation()
                || matches!(
                    db_err.code().as_deref(),
                    Some(
                        SQLITE_BUSY
                            | SQLITE_LOCKED
                            | SQLITE_BUSY_SNAPSHOT
                            | SQLITE_CONSTRAINT_PRIMARYKEY
                            | SQLITE_CONSTRAINT_UNIQUE
                    )
                );
            if conflict {
                return Self::OrderConflict;
            }
        }
        Self::Database(err)
    }
}

// Malformed or wrongly typed request bodies are validation failures
impl From<JsonRejection> for TodoError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl IntoResponse for TodoError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            json!({"status": "error", "message": self.to_string()})
        } else {
            if self.is_retryable() {
                tracing::warn!(error = %self, "mutation rejected");
            }
            json!({"status": "fail", "message": self.to_string()})
        };
        (status, Json(body)).into_response()
    }
}
