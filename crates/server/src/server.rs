use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use engine::Engine;

use crate::{balance, budget, cash_flow, editor, goals, networth};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

impl ServerState {
    /// Report date for this request, in the server's time zone.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// The application router; exposed so tests and embedders can drive it
/// without a listener.
pub fn app(engine: Arc<Engine>) -> Router {
    router(ServerState { engine })
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/networth", get(networth::networth))
        .route("/api/current_networth", get(networth::current_networth))
        .route("/api/cash_flow", get(cash_flow::cash_flow))
        .route("/api/current_cash_flow", get(cash_flow::current_cash_flow))
        .route("/api/balance", get(balance::balance))
        .route("/api/checking_balance", get(balance::checking_balance))
        .route("/api/allocation", get(balance::allocation))
        .route("/api/budget", get(budget::budget))
        .route("/api/current_budget", get(budget::current_budget))
        .route("/api/goals/retirement/{name}", get(goals::retirement))
        .route("/api/goals/savings/{name}", get(goals::savings))
        .route("/api/editor/validate", post(editor::validate))
        .route("/api/editor/sheet/evaluate", post(editor::evaluate))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine };
    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
