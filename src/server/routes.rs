use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::{
    analytics::{AppUsageEntry, DailyRollupEntry, SessionSummary},
    db::{Session, SessionObservation, StartedSession},
    error::{CoreError, CoreResult},
    tracking::{LiveStatus, RawObservation},
};

use super::{owner::OwnerId, state::AppState};

const DEFAULT_REPORT_DAYS: i64 = 7;

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Session lifecycle ───────────────────────────────────────────────────

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(history))
        .route("/api/sessions/start", post(start_session))
        .route("/api/sessions/current", get(current_session))
        .route("/api/sessions/{id}", get(session_by_id))
        .route("/api/sessions/{id}/activate", post(activate_session))
        .route("/api/sessions/{id}/telemetry", post(ingest_observation))
        .route("/api/sessions/{id}/stop", post(stop_session))
        .route("/api/sessions/{id}/summary", get(session_summary))
        .route("/api/sessions/{id}/observations", get(session_observations))
        .route("/api/status", get(live_status))
}

async fn start_session(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> CoreResult<Json<StartedSession>> {
    Ok(Json(state.sessions.start(&owner).await?))
}

async fn activate_session(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> CoreResult<Json<Session>> {
    Ok(Json(state.sessions.activate(&id, &owner).await?))
}

async fn ingest_observation(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
    body: Result<Json<RawObservation>, JsonRejection>,
) -> CoreResult<Json<serde_json::Value>> {
    let Json(raw) = body.map_err(|rejection| CoreError::validation(rejection.body_text()))?;
    state.sessions.ingest(&id, &owner, raw).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

async fn stop_session(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> CoreResult<Json<Session>> {
    Ok(Json(state.sessions.stop(&id, &owner).await?))
}

async fn current_session(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> CoreResult<Json<Session>> {
    Ok(Json(state.sessions.current(&owner).await?))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
    #[serde(default)]
    offset: usize,
}

async fn history(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> CoreResult<Json<Vec<Session>>> {
    let Query(query) = query.map_err(|rejection| CoreError::validation(rejection.body_text()))?;
    let sessions = match query.limit {
        Some(limit) => state.sessions.history_page(&owner, limit, query.offset).await?,
        None => state.sessions.history(&owner).await?,
    };
    Ok(Json(sessions))
}

async fn session_by_id(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> CoreResult<Json<Session>> {
    Ok(Json(state.sessions.get_by_id(&id, &owner).await?))
}

async fn session_summary(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> CoreResult<Json<SessionSummary>> {
    Ok(Json(state.reports.session_summary(&id, &owner).await?))
}

async fn session_observations(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> CoreResult<Json<Vec<SessionObservation>>> {
    Ok(Json(state.sessions.observations(&id, &owner).await?))
}

async fn live_status(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> CoreResult<Json<LiveStatus>> {
    Ok(Json(state.sessions.live_status(&owner).await?))
}

// ── Analytics ───────────────────────────────────────────────────────────

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/daily", get(daily_rollup))
        .route("/api/analytics/apps", get(daily_app_usage))
}

#[derive(Debug, Deserialize)]
struct DaysQuery {
    days: Option<i64>,
}

fn days_from(query: Result<Query<DaysQuery>, QueryRejection>) -> CoreResult<i64> {
    let Query(query) = query.map_err(|rejection| CoreError::validation(rejection.body_text()))?;
    Ok(query.days.unwrap_or(DEFAULT_REPORT_DAYS))
}

async fn daily_rollup(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    query: Result<Query<DaysQuery>, QueryRejection>,
) -> CoreResult<Json<Vec<DailyRollupEntry>>> {
    let days = days_from(query)?;
    Ok(Json(state.reports.daily_rollup(&owner, days).await?))
}

async fn daily_app_usage(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    query: Result<Query<DaysQuery>, QueryRejection>,
) -> CoreResult<Json<Vec<AppUsageEntry>>> {
    let days = days_from(query)?;
    Ok(Json(state.reports.daily_app_usage(&owner, days).await?))
}
