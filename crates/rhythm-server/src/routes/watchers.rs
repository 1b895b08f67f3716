use axum::extract::{Path, State};
use axum::Json;
use rhythm_core::action::ActionPatch;
use rhythm_core::circle::SupportMember;
use rhythm_core::persist::ActionStore;
use rhythm_core::watcher;

use crate::error::AppError;
use crate::routes::events::Change;
use crate::state::AppState;

/// GET /api/actions/:id/watchers: members watching an action.
pub async fn list_watchers(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SupportMember>>, AppError> {
    let root = app.root.clone();
    let store = app.store.clone();
    let members = tokio::task::spawn_blocking(move || {
        let action = store.load(&id)?;
        let members = SupportMember::list(&root)?;
        let watching = watcher::watching_members(&action, &members)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        Ok::<_, rhythm_core::RhythmError>(watching)
    })
    .await
    .map_err(AppError::join)??;
    Ok(Json(members))
}

/// POST /api/actions/:id/watchers/:member_id: add the member if absent,
/// remove them if present. Only active members can be added.
pub async fn toggle_watcher(
    State(app): State<AppState>,
    Path((id, member_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let (store, cache) = (app.store.clone(), app.cache.clone());
    let result = tokio::task::spawn_blocking(move || {
        let action = store.load(&id)?;
        let mut watchers = action.watchers.clone();
        let watching = watcher::toggle_watcher(&mut watchers, &member_id);
        if watching {
            let members = SupportMember::list(&root)?;
            watcher::validate_watchers(std::slice::from_ref(&member_id), &members)?;
        }
        let stored = store.update(
            &action.id,
            &ActionPatch::watchers(watchers).expecting(action.version),
        )?;
        cache.put(&stored);
        Ok::<_, rhythm_core::RhythmError>(serde_json::json!({
            "action_id": stored.id,
            "member_id": member_id,
            "watching": watching,
            "watchers": stored.watchers,
            "version": stored.version,
        }))
    })
    .await
    .map_err(AppError::join)??;

    app.notify(Change::Actions);
    Ok(Json(result))
}
