//! Goal API endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use engine::{RetirementProgress, SavingsProjection};

use crate::{ServerError, server::ServerState};

pub async fn retirement(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Json<RetirementProgress>, ServerError> {
    let progress = state.engine.retirement_goal(&name, state.today()).await?;
    Ok(Json(progress))
}

pub async fn savings(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<Json<SavingsProjection>, ServerError> {
    let projection = state.engine.savings_goal(&name, state.today()).await?;
    Ok(Json(projection))
}
