//! Balance and allocation API endpoints.

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use engine::{AllocationReport, AssetBreakdown};

use crate::{ServerError, server::ServerState};

pub async fn balance(
    State(state): State<ServerState>,
) -> Result<Json<BTreeMap<String, AssetBreakdown>>, ServerError> {
    Ok(Json(state.engine.balance(state.today()).await))
}

pub async fn checking_balance(
    State(state): State<ServerState>,
) -> Result<Json<BTreeMap<String, AssetBreakdown>>, ServerError> {
    Ok(Json(state.engine.checking_balance(state.today()).await))
}

pub async fn allocation(
    State(state): State<ServerState>,
) -> Result<Json<AllocationReport>, ServerError> {
    Ok(Json(state.engine.allocation(state.today()).await))
}
