//! Budget API endpoints.

use axum::{Json, extract::State};
use engine::{BudgetReport, CancelToken};

use crate::{ServerError, server::ServerState};

pub async fn budget(State(state): State<ServerState>) -> Result<Json<BudgetReport>, ServerError> {
    let report = state
        .engine
        .budget(state.today(), &CancelToken::new())
        .await?;
    Ok(Json(report))
}

pub async fn current_budget(
    State(state): State<ServerState>,
) -> Result<Json<BudgetReport>, ServerError> {
    let report = state
        .engine
        .current_budget(state.today(), &CancelToken::new())
        .await?;
    Ok(Json(report))
}
