use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use utoipa::ToSchema;

use crate::{
    dao::storage::StorageError,
    state::{
        queue::QueueClosed,
        state_machine::{ApplyError, InvalidTransition},
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The actor is not on the admin allow-list.
    #[error("only the game host can do that")]
    NotAuthorized,
    /// No non-finished game exists.
    #[error("no active game")]
    NoActiveGame,
    /// The requested transition is not valid from the current status.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    /// Buzzing or judging requires an open question.
    #[error("no question is open")]
    NoActiveQuestion,
    /// The player is not registered in any team.
    #[error("player has no team")]
    NoTeam,
    /// The player already belongs to a team.
    #[error("player already belongs to team `{team_name}`")]
    AlreadyOnTeam {
        /// Name of the team the player is on.
        team_name: String,
    },
    /// Another team already uses this name.
    #[error("team name `{name}` is already taken")]
    DuplicateTeamName {
        /// Requested name.
        name: String,
    },
    /// The team name is empty or too long.
    #[error("invalid team name: {0}")]
    InvalidName(String),
    /// No team is waiting to answer.
    #[error("nobody is queued to answer")]
    QueueEmpty,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Storage backend failed; nothing was applied.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Unexpected failure, such as a crashed worker task.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable code exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotAuthorized => "not_authorized",
            ServiceError::NoActiveGame => "no_active_game",
            ServiceError::InvalidStateTransition(_) => "invalid_state_transition",
            ServiceError::NoActiveQuestion => "no_active_question",
            ServiceError::NoTeam => "no_team",
            ServiceError::AlreadyOnTeam { .. } => "already_on_team",
            ServiceError::DuplicateTeamName { .. } => "duplicate_team_name",
            ServiceError::InvalidName(_) => "invalid_name",
            ServiceError::QueueEmpty => "queue_empty",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Unavailable(_) => "unavailable",
            ServiceError::Degraded => "degraded",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidStateTransition(err.to_string())
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        ServiceError::InvalidStateTransition(err.to_string())
    }
}

impl From<QueueClosed> for ServiceError {
    fn from(_: QueueClosed) -> Self {
        ServiceError::NoActiveQuestion
    }
}

impl From<JoinError> for ServiceError {
    fn from(err: JoinError) -> Self {
        ServiceError::Internal(format!("service task failed: {err}"))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {message}")]
    BadRequest {
        /// Machine-readable code.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },
    /// Caller did not identify itself.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Machine-readable code.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },
    /// Caller is identified but not allowed.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Machine-readable code.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },
    /// Requested resource not found.
    #[error("not found: {message}")]
    NotFound {
        /// Machine-readable code.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },
    /// Conflict with current state.
    #[error("conflict: {message}")]
    Conflict {
        /// Machine-readable code.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },
    /// Service unavailable or degraded.
    #[error("service unavailable: {message}")]
    ServiceUnavailable {
        /// Machine-readable code.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },
    /// Internal server error.
    #[error("internal error: {message}")]
    Internal {
        /// Machine-readable code.
        code: &'static str,
        /// Human readable explanation.
        message: String,
    },
}

impl AppError {
    /// Request without the `x-user-id` identity header.
    pub fn missing_identity() -> Self {
        AppError::Unauthorized {
            code: "missing_identity",
            message: "x-user-id header with a numeric user id is required".into(),
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            AppError::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, *code, message.as_str())
            }
            AppError::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, *code, message.as_str())
            }
            AppError::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, *code, message.as_str())
            }
            AppError::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, *code, message.as_str())
            }
            AppError::Conflict { code, message } => {
                (StatusCode::CONFLICT, *code, message.as_str())
            }
            AppError::ServiceUnavailable { code, message } => {
                (StatusCode::SERVICE_UNAVAILABLE, *code, message.as_str())
            }
            AppError::Internal { code, message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, *code, message.as_str())
            }
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            ServiceError::NotAuthorized => AppError::Forbidden { code, message },
            ServiceError::NoActiveGame | ServiceError::NotFound(_) => {
                AppError::NotFound { code, message }
            }
            ServiceError::InvalidStateTransition(_)
            | ServiceError::NoActiveQuestion
            | ServiceError::NoTeam
            | ServiceError::AlreadyOnTeam { .. }
            | ServiceError::DuplicateTeamName { .. }
            | ServiceError::QueueEmpty => AppError::Conflict { code, message },
            ServiceError::InvalidName(_) | ServiceError::InvalidInput(_) => {
                AppError::BadRequest { code, message }
            }
            ServiceError::Unavailable(source) if !source.is_transient() => AppError::Internal {
                code,
                message: source.to_string(),
            },
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable {
                code,
                message: source.to_string(),
            },
            ServiceError::Degraded => AppError::ServiceUnavailable { code, message },
            ServiceError::Internal(_) => AppError::Internal { code, message },
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `no_active_question`.
    pub code: String,
    /// Human readable message.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = self.parts();
        let payload = Json(ErrorBody {
            code: code.to_string(),
            message: message.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_http_status() {
        let cases = [
            (ServiceError::NotAuthorized, StatusCode::FORBIDDEN),
            (ServiceError::NoActiveGame, StatusCode::NOT_FOUND),
            (ServiceError::NoActiveQuestion, StatusCode::CONFLICT),
            (
                ServiceError::DuplicateTeamName {
                    name: "Nova".into(),
                },
                StatusCode::CONFLICT,
            ),
            (ServiceError::InvalidName("empty".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Degraded, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, status) in cases {
            let code = err.code();
            let app: AppError = err.into();
            let (actual, actual_code, _) = app.parts();
            assert_eq!(actual, status);
            assert_eq!(actual_code, code);
        }
    }

    #[test]
    fn storage_failures_split_on_retryability() {
        let io = std::io::Error::other("disk gone");
        let transient: AppError = ServiceError::from(StorageError::unavailable("write", io)).into();
        assert_eq!(transient.parts().0, StatusCode::SERVICE_UNAVAILABLE);

        let decode = serde_json::from_str::<u32>("x").unwrap_err();
        let corrupt: AppError = ServiceError::from(StorageError::corrupt("decode", decode)).into();
        assert_eq!(corrupt.parts().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn queue_closed_means_no_question() {
        let err: ServiceError = QueueClosed.into();
        assert_eq!(err.code(), "no_active_question");
    }
}
