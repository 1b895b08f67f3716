use axum::extract::State;
use axum::Json;
use rhythm_core::config::{Config, DEFAULT_MAX_MANUAL_PRIORITY};
use rhythm_core::display::{priority_display, status_catalog, PriorityDisplay, FALLBACK_STATUS};
use rhythm_core::RhythmError;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/statuses: the canonical status and priority display tables.
pub async fn get_statuses(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let max = tokio::task::spawn_blocking(move || match Config::load(&root) {
        Ok(cfg) => Ok(cfg.priorities.max_manual),
        Err(RhythmError::NotInitialized) => Ok(DEFAULT_MAX_MANUAL_PRIORITY),
        Err(e) => Err(e),
    })
    .await
    .map_err(AppError::join)??;

    let priorities: Vec<PriorityDisplay> = (1..=max).map(priority_display).collect();
    Ok(Json(serde_json::json!({
        "statuses": status_catalog(),
        "fallback": FALLBACK_STATUS,
        "priorities": priorities,
    })))
}
