//! Editor API endpoints: sheet lint and evaluation.

use api_types::editor::SheetRequest;
use axum::{Json, extract::State};
use engine::{Diagnostic, LineResult};

use crate::{ServerError, server::ServerState};

pub async fn validate(
    State(state): State<ServerState>,
    Json(payload): Json<SheetRequest>,
) -> Result<Json<Vec<Diagnostic>>, ServerError> {
    Ok(Json(state.engine.validate_sheet(&payload.content)))
}

pub async fn evaluate(
    State(state): State<ServerState>,
    Json(payload): Json<SheetRequest>,
) -> Result<Json<Vec<LineResult>>, ServerError> {
    let results = state
        .engine
        .evaluate_sheet(&payload.content, state.today())
        .await;
    Ok(Json(results))
}
