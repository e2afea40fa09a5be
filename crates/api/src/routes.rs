use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json,
    Router,
};
use core_sim::{Command, ShareCount, SimError, Snapshot};
use runtime::LatencyPercentiles;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::ApiError,
    state::{AppState, StateView},
    ws,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(current_state))
        .route("/api/tick", post(tick))
        .route("/api/commands", post(apply_command))
        .route("/api/pause", post(pause))
        .route("/api/resume", post(resume))
        .route("/api/metrics", get(metrics))
        .route("/ws/events", get(ws::events_socket))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct PauseResponse {
    paused: bool,
    changed: bool,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    tick: u64,
    paused: bool,
    transition_latency: Option<LatencyPercentiles>,
}

async fn current_state(State(state): State<AppState>) -> Result<Json<Snapshot>, ApiError> {
    Ok(Json(state.sim().state().await?))
}

async fn tick(State(state): State<AppState>) -> Result<Json<StateView>, ApiError> {
    let snapshot = state.sim().tick().await?;
    Ok(Json(StateView::from(snapshot.as_ref())))
}

async fn apply_command(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<StateView>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        debug!(%rejection, "malformed command");
        ApiError::InvalidCommand(rejection.body_text())
    })?;
    let command = parse_command(body)?;
    let snapshot = state.sim().apply_command(command).await?;
    Ok(Json(StateView::from(snapshot.as_ref())))
}

/// Share counts are checked before the command shape so a bad count reports
/// `invalid_share_count` rather than a generic decode failure.
fn parse_command(body: Value) -> Result<Command, ApiError> {
    if let Some(shares) = body.get("shares") {
        let valid = shares
            .as_f64()
            .is_some_and(|shares| ShareCount::try_from(shares).is_ok());
        if !valid {
            return Err(ApiError::InvalidInput(SimError::InvalidShareCount));
        }
    }
    serde_json::from_value(body).map_err(|err| ApiError::InvalidCommand(err.to_string()))
}

async fn pause(State(state): State<AppState>) -> Result<Json<PauseResponse>, ApiError> {
    let changed = state.sim().pause().await?;
    Ok(Json(PauseResponse {
        paused: true,
        changed,
    }))
}

async fn resume(State(state): State<AppState>) -> Result<Json<PauseResponse>, ApiError> {
    let changed = state.sim().resume().await?;
    Ok(Json(PauseResponse {
        paused: false,
        changed,
    }))
}

async fn metrics(State(state): State<AppState>) -> Result<Json<MetricsResponse>, ApiError> {
    let sim = state.sim();
    let tick = sim.state().await?.tick;
    Ok(Json(MetricsResponse {
        tick,
        paused: sim.is_paused(),
        transition_latency: sim.latency().await?,
    }))
}
