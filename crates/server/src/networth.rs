//! Net worth API endpoints.

use axum::{Json, extract::State};
use engine::{CancelToken, CurrentNetworthReport, NetworthReport};

use crate::{ServerError, server::ServerState};

pub async fn networth(
    State(state): State<ServerState>,
) -> Result<Json<NetworthReport>, ServerError> {
    let report = state
        .engine
        .networth(state.today(), &CancelToken::new())
        .await?;
    Ok(Json(report))
}

pub async fn current_networth(
    State(state): State<ServerState>,
) -> Result<Json<CurrentNetworthReport>, ServerError> {
    let report = state.engine.current_networth(state.today()).await?;
    Ok(Json(report))
}
