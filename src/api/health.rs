use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::orchestration::BulkState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Readiness check; also reports whether a bulk run is in progress.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let bulk_busy = state.worklist.lock().await.bulk_state() == BulkState::Running;
    Json(serde_json::json!({"status": "ready", "bulkBusy": bulk_busy}))
}
