use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::engine::{EngineError, Prompt},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Players are already on another court; nothing can override this.
    #[error("already playing on another court: {}", .players.join(", "))]
    ConflictBlock {
        /// Names of the players on the other court.
        players: Vec<String>,
    },
    /// The intent needs the caller's confirmation or choice first.
    #[error("decision required")]
    DecisionRequired(Prompt),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
    /// The command processor is no longer running.
    #[error("command processor stopped")]
    Closed,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(invalid) => ServiceError::InvalidInput(invalid.to_string()),
            EngineError::ConflictBlock { players } => ServiceError::ConflictBlock { players },
            EngineError::DecisionRequired(prompt) => ServiceError::DecisionRequired(prompt),
            EngineError::NotFound(missing) => ServiceError::NotFound(missing.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with the players currently on court.
    #[error("conflict: already playing on another court: {}", .players.join(", "))]
    Conflict {
        /// Names of the players on the other court.
        players: Vec<String>,
    },
    /// The caller must answer the prompt and resend the request.
    #[error("decision required")]
    PreconditionRequired(Prompt),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::ConflictBlock { players } => AppError::Conflict { players },
            ServiceError::DecisionRequired(prompt) => AppError::PreconditionRequired(prompt),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
            ServiceError::Closed => AppError::ServiceUnavailable("shutting down".into()),
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize)]
struct ErrorBody {
    message: String,
    players: Option<Vec<String>>,
    prompt: Option<Prompt>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::PreconditionRequired(_) => StatusCode::PRECONDITION_REQUIRED,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let message = self.to_string();
        let payload = match self {
            AppError::Conflict { players } => ErrorBody {
                message,
                players: Some(players),
                prompt: None,
            },
            AppError::PreconditionRequired(prompt) => ErrorBody {
                message,
                players: None,
                prompt: Some(prompt),
            },
            _ => ErrorBody {
                message,
                players: None,
                prompt: None,
            },
        };

        (status, Json(payload)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::engine::{Missing, ValidationError};

    #[test]
    fn engine_errors_map_to_http_statuses() {
        let cases = [
            (
                EngineError::from(ValidationError::EmptyName),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::ConflictBlock {
                    players: vec!["Kim".into()],
                },
                StatusCode::CONFLICT,
            ),
            (
                EngineError::DecisionRequired(Prompt::ConfirmReset),
                StatusCode::PRECONDITION_REQUIRED,
            ),
            (EngineError::from(Missing::Court(7)), StatusCode::NOT_FOUND),
        ];

        for (engine_error, status) in cases {
            let response = AppError::from(ServiceError::from(engine_error)).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn storage_failures_are_unavailable() {
        let response = AppError::from(ServiceError::Timeout).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
