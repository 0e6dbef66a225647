use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use shared::error::{CoinError, RewardError};
use shared::persistence::PersistenceError;
use shared::shared_wheel_game::WheelError;

#[derive(Debug)]
pub enum Error {
    Coin(CoinError),
    Reward(RewardError),
    Wheel(WheelError),
    Persistence(PersistenceError),
    UnknownSession,
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Coin(e) => write!(f, "{}", e),
            Error::Reward(e) => write!(f, "{}", e),
            Error::Wheel(e) => write!(f, "{}", e),
            Error::Persistence(e) => write!(f, "{}", e),
            Error::UnknownSession => write!(f, "Unknown wheel session"),
            Error::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<CoinError> for Error {
    fn from(err: CoinError) -> Self {
        Error::Coin(err)
    }
}

impl From<RewardError> for Error {
    fn from(err: RewardError) -> Self {
        Error::Reward(err)
    }
}

impl From<WheelError> for Error {
    fn from(err: WheelError) -> Self {
        Error::Wheel(err)
    }
}

impl From<PersistenceError> for Error {
    fn from(err: PersistenceError) -> Self {
        Error::Persistence(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Error::Coin(e) => {
                let status = match e {
                    CoinError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                    CoinError::InsufficientFunds { .. } => StatusCode::CONFLICT,
                };
                (status, json!({ "error": e.user_message() }))
            }
            Error::Reward(e) => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": e.user_message(),
                    "remaining_seconds": e.remaining().as_secs(),
                }),
            ),
            Error::Wheel(e) => {
                let (status, message) = match e {
                    WheelError::Rejected(rejection) => (StatusCode::BAD_REQUEST, rejection.message().to_string()),
                    WheelError::NumberOutOfRange { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
                    WheelError::SpinInProgress | WheelError::NoSpinInProgress => (StatusCode::CONFLICT, e.to_string()),
                };
                (status, json!({ "error": message }))
            }
            Error::UnknownSession => (StatusCode::NOT_FOUND, json!({ "error": "Unknown wheel session" })),
            Error::Persistence(e) => {
                tracing::error!("Storage failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Storage error" }))
            }
            Error::Internal(e) => {
                tracing::error!("Internal failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error" }))
            }
        };
        (status, Json(body)).into_response()
    }
}
