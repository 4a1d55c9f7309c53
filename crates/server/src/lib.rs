use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use serde::Serialize;

pub use server::{ServerState, app, run_with_listener, spawn_with_listener};

mod balance;
mod budget;
mod cash_flow;
mod editor;
mod goals;
mod networth;
mod server;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ConfigInvalid(_)
        | EngineError::JournalParse { .. }
        | EngineError::Sheet(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::PriceFetch { .. } => StatusCode::BAD_GATEWAY,
        EngineError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        EngineError::Database(_) | EngineError::DbCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::DbCorruption(message) => {
            tracing::error!("database corrupted: {message}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
