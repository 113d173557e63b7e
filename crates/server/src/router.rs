//! HTTP router construction.
//!
//! Assembles all Axum routes and middleware into a single `Router`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/scheduler/status", get(api::scheduler_status))
        .route("/api/scheduler/reload", post(api::scheduler_reload))
        .route(
            "/api/triggers",
            get(api::triggers_list).post(api::triggers_create),
        )
        .route(
            "/api/triggers/{id}",
            get(api::triggers_get)
                .put(api::triggers_update)
                .delete(api::triggers_delete),
        )
        .route(
            "/api/triggers/{id}/active",
            axum::routing::patch(api::triggers_set_active),
        )
        .route("/api/triggers/{id}/execute", post(api::triggers_execute))
        .route("/api/triggers/{id}/history", get(api::triggers_history))
        .route("/api/triggers/{id}/stats", get(api::triggers_stats))
        .route("/api/executions", get(api::executions_list))
        .route("/api/executions/purge", post(api::executions_purge))
        .route("/api/notifications/pending", get(api::notifications_pending))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
