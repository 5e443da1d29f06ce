//! Liveness endpoint for load balancers and deploy scripts.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Report the server version and whether full tasks can still be archived.
///
/// `archiver` turns `"stopped"` once shutdown has begun; the server keeps
/// answering task reads until it exits.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let archiver = if state.tasks.is_archiving() {
        "running"
    } else {
        "stopped"
    };
    Json(json!({
        "status":   "ok",
        "version":  env!("CARGO_PKG_VERSION"),
        "archiver": archiver,
    }))
}
