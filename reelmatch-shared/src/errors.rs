use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E3xxx: Room errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    ServiceUnavailable,

    // Rooms (E3xxx)
    RoomNotFound,
    ParticipantNotFound,
    InvalidRoomCode,
    MovieNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::ServiceUnavailable => "E0007",

            // Rooms
            Self::RoomNotFound => "E3001",
            Self::ParticipantNotFound => "E3002",
            Self::InvalidRoomCode => "E3003",
            Self::MovieNotFound => "E3004",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ValidationError | Self::InvalidRoomCode => StatusCode::BAD_REQUEST,
            Self::RoomNotFound | Self::ParticipantNotFound | Self::MovieNotFound => {
                StatusCode::NOT_FOUND
            }
        }
    }
}

/// Why a backend (store or catalog) call failed, as far as a user needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    Down,
    SchemaMissing,
    Misconfigured,
    Other,
}

impl BackendFailure {
    /// Classifies a raw backend error message.
    ///
    /// A paused or unreachable backend tends to answer with an HTML error page
    /// or a timeout instead of a structured error, so those are sniffed first.
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_lowercase();

        if raw.contains("<!DOCTYPE")
            || raw.contains("522")
            || lower.contains("connection timed out")
            || lower.contains("connection refused")
            || lower.contains("timed out waiting for connection")
        {
            return Self::Down;
        }

        if lower.contains("schema cache")
            || lower.contains("relation")
            || lower.contains("does not exist")
        {
            return Self::SchemaMissing;
        }

        if lower.contains("api key")
            || lower.contains("api_key")
            || lower.contains("not configured")
            || lower.contains("password authentication failed")
            || lower.contains("invalid credentials")
        {
            return Self::Misconfigured;
        }

        Self::Other
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Down => "backend is unreachable, check that the database and catalog services are running",
            Self::SchemaMissing => "database schema is not provisioned, run the migrations",
            Self::Misconfigured => "backend credentials are missing or invalid, check the service configuration",
            Self::Other => "backend request failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known { code: ErrorCode, message: String },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Backend failure with an explicit classification.
    pub fn backend(failure: BackendFailure, raw: impl std::fmt::Display) -> Self {
        tracing::error!(error = %raw, kind = ?failure, "backend failure");
        Self::new(ErrorCode::ServiceUnavailable, failure.message())
    }

    /// Backend failure classified from its raw message.
    pub fn unavailable(raw: impl std::fmt::Display) -> Self {
        let raw = raw.to_string();
        Self::backend(BackendFailure::classify(&raw), raw)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message } => {
                (code.status_code(), ApiErrorResponse::new(code.code(), message))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_cloudflare_pages_as_down() {
        let raw = "<!DOCTYPE html><title>522: Connection timed out</title>";
        assert_eq!(BackendFailure::classify(raw), BackendFailure::Down);
    }

    #[test]
    fn classifies_missing_relation_as_schema_missing() {
        let raw = r#"relation "rooms" does not exist"#;
        assert_eq!(BackendFailure::classify(raw), BackendFailure::SchemaMissing);
    }

    #[test]
    fn classifies_missing_key_as_misconfigured() {
        assert_eq!(
            BackendFailure::classify("TMDB API key is not configured"),
            BackendFailure::Misconfigured
        );
        assert_eq!(
            BackendFailure::classify("FATAL: password authentication failed for user \"reelmatch\""),
            BackendFailure::Misconfigured
        );
    }

    #[test]
    fn unknown_failures_fall_through() {
        assert_eq!(BackendFailure::classify("deadlock detected"), BackendFailure::Other);
    }

    #[test]
    fn backend_failures_share_one_code() {
        for raw in ["connection refused", "relation x does not exist", "api key missing", "boom"] {
            let err = AppError::unavailable(raw);
            assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
            assert_eq!(err.code().status_code(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    #[test]
    fn not_found_is_distinct_from_generic_failure() {
        let err = AppError::new(ErrorCode::RoomNotFound, "room not found");
        assert_eq!(err.code().status_code(), StatusCode::NOT_FOUND);
        assert_ne!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
