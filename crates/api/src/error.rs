use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_sim::{CommandRejected, SimError};
use runtime::DriverError;
use serde::Serialize;
use thiserror::Error;

use crate::state::StateView;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Rejected(CommandRejected),
    #[error(transparent)]
    InvalidInput(SimError),
    #[error("malformed command: {0}")]
    InvalidCommand(String),
    #[error("simulation driver is not running")]
    Unavailable,
}

impl From<DriverError> for ApiError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Rejected(rejected) => Self::Rejected(rejected),
            DriverError::Stopped => Self::Unavailable,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<StateView>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Rejected(CommandRejected { error, .. }) | Self::InvalidInput(error) => {
                match error {
                    SimError::InsufficientFunds { .. } => StatusCode::CONFLICT,
                    SimError::InvalidShareCount => StatusCode::UNPROCESSABLE_ENTITY,
                    SimError::IndexOutOfRange { .. } | SimError::PositionNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                }
            }
            Self::InvalidCommand(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Rejected(CommandRejected { error, .. }) | Self::InvalidInput(error) => {
                error.code()
            }
            Self::InvalidCommand(_) => "invalid_command",
            Self::Unavailable => "driver_stopped",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
            state: match self {
                Self::Rejected(rejected) => Some(StateView::from(rejected.snapshot.as_ref())),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}
