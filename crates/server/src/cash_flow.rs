//! Cash flow API endpoints.

use axum::{Json, extract::State};
use engine::{CancelToken, CashFlow};

use crate::{ServerError, server::ServerState};

pub async fn cash_flow(
    State(state): State<ServerState>,
) -> Result<Json<Vec<CashFlow>>, ServerError> {
    let flows = state
        .engine
        .cash_flow(state.today(), &CancelToken::new())
        .await?;
    Ok(Json(flows))
}

pub async fn current_cash_flow(
    State(state): State<ServerState>,
) -> Result<Json<Vec<CashFlow>>, ServerError> {
    let flows = state
        .engine
        .current_cash_flow(state.today(), &CancelToken::new())
        .await?;
    Ok(Json(flows))
}
