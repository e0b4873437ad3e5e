//! Error taxonomy shared by the rules engine, the belief tracker, and the
//! HTTP layer. Mirrors the kinds from the specification's error-handling
//! design: the engine never recovers silently from a contradiction.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("coordinates out of bounds: ({0}, {1})")]
    OutOfBounds(i32, i32),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("fatal invariant violation: {0}")]
    Fatal(String),

    #[error("malformed persisted data: {0}")]
    Data(String),

    #[error("not found")]
    NotFound,

    #[error("storage or transport failure: {0}")]
    System(String),

    #[error("missing or invalid authentication token")]
    Unauthorized,
}

impl GameError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::OutOfBounds(..) => StatusCode::BAD_REQUEST,
            GameError::Engine(_) => StatusCode::BAD_REQUEST,
            GameError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GameError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GameError::NotFound => StatusCode::NOT_FOUND,
            GameError::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GameError::Unauthorized => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        if let GameError::Fatal(ref msg) = self {
            log::error!("fatal invariant violation: {msg}");
        }
        let status = self.status_code();
        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
