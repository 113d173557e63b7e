//! HTTP handlers for the operational API.
//!
//! The CRUD handlers delegate to [`TriggerService`] and then ask the
//! scheduler to reload, so the job table always reflects persisted state.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use duewatch_core::{Error, NewTrigger, TriggerPatch};
use duewatch_engine::alerts;

use crate::state::AppState;

/// Maps core errors onto HTTP statuses.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::TriggerNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Dispatch(_) => StatusCode::BAD_GATEWAY,
            Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ── Scheduler ───────────────────────────────────────────────────────

pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.status().await)
}

pub async fn scheduler_reload(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let jobs = state.scheduler.reload().await?;
    Ok(Json(json!({ "jobs": jobs })))
}

// ── Trigger CRUD ────────────────────────────────────────────────────

pub async fn triggers_list(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list().await?))
}

pub async fn triggers_create(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewTrigger>,
) -> ApiResult<impl IntoResponse> {
    let trigger = state.service.create(new).await?;
    state.scheduler.reload().await?;
    Ok((StatusCode::CREATED, Json(trigger)))
}

pub async fn triggers_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.get(id).await?))
}

pub async fn triggers_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<TriggerPatch>,
) -> ApiResult<impl IntoResponse> {
    let trigger = state.service.update(id, patch).await?;
    state.scheduler.reload().await?;
    Ok(Json(trigger))
}

pub async fn triggers_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete(id).await?;
    state.scheduler.reload().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ActivePayload {
    pub active: bool,
}

pub async fn triggers_set_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<ActivePayload>,
) -> ApiResult<impl IntoResponse> {
    let trigger = state.service.set_active(id, payload.active).await?;
    state.scheduler.reload().await?;
    Ok(Json(trigger))
}

pub async fn triggers_execute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.scheduler.execute_now(id).await?))
}

// ── Execution history & stats ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

pub async fn triggers_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<impl IntoResponse> {
    let limit = params.limit.or(Some(50));
    Ok(Json(state.recorder.history(id, limit).await?))
}

pub async fn triggers_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.recorder.stats(id).await?))
}

pub async fn executions_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<impl IntoResponse> {
    let limit = params.limit.or(Some(100));
    Ok(Json(state.recorder.all_history(limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct PurgeParams {
    pub days: Option<i64>,
}

pub async fn executions_purge(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PurgeParams>,
) -> ApiResult<impl IntoResponse> {
    let days = params.days.unwrap_or(state.retention_days);
    let removed = state.recorder.purge_older_than(days).await?;
    Ok(Json(json!({ "removed": removed })))
}

// ── Pending notifications ───────────────────────────────────────────

/// Evaluate alerts on demand, without firing any trigger.
pub async fn notifications_pending(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let companies = state.directory.list_active_companies().await?;
    let now = state.clock.now();
    let pending = alerts::evaluate(&companies, now);
    let total = pending.len();
    Ok(Json(json!({
        "data": pending,
        "total": total,
        "generated_at": now,
    })))
}
