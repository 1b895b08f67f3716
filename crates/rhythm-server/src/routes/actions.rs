use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use rhythm_core::action::{Action, ActionPatch, MicroTask};
use rhythm_core::circle::SupportMember;
use rhythm_core::display::{priority_display, status_display};
use rhythm_core::order::next_priority;
use rhythm_core::persist::{ActionStore, Scope};
use rhythm_core::recording::Recording;
use rhythm_core::types::ActionStatus;
use rhythm_core::watcher::validate_watchers;

use crate::error::AppError;
use crate::routes::events::Change;
use crate::state::AppState;

/// An action with its display entries and micro-task progress attached.
pub(crate) fn action_json(action: &Action) -> serde_json::Value {
    let mut value = serde_json::json!(action);
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "status_display".to_string(),
            serde_json::json!(status_display(&action.status)),
        );
        obj.insert(
            "priority_display".to_string(),
            serde_json::json!(priority_display(action.priority_level)),
        );
        obj.insert(
            "micro_task_progress".to_string(),
            serde_json::json!(action.micro_task_progress()),
        );
    }
    value
}

pub(crate) fn actions_json(actions: &[Action]) -> Vec<serde_json::Value> {
    actions.iter().map(action_json).collect()
}

/// GET /api/actions: every action in display order.
pub async fn list_actions(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let (store, cache) = (app.store.clone(), app.cache.clone());
    let actions = tokio::task::spawn_blocking(move || cache.scope(&*store, &Scope::All))
        .await
        .map_err(AppError::join)??;
    Ok(Json(serde_json::json!(actions_json(&actions))))
}

/// GET /api/actions/:id
pub async fn get_action(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let action = tokio::task::spawn_blocking(move || store.load(&id))
        .await
        .map_err(AppError::join)??;
    Ok(Json(action_json(&action)))
}

#[derive(serde::Deserialize)]
pub struct CreateActionBody {
    pub text: String,
    #[serde(default)]
    pub recording_id: Option<String>,
    #[serde(default)]
    pub priority_level: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub success_criteria: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub micro_tasks: Vec<String>,
}

/// POST /api/actions: enter an action by hand. Without a priority it goes
/// to the end of its list.
pub async fn create_action(
    State(app): State<AppState>,
    Json(body): Json<CreateActionBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let status: Option<ActionStatus> = body.status.as_deref().map(str::parse).transpose()?;
    let root = app.root.clone();
    let (store, cache) = (app.store.clone(), app.cache.clone());
    let action = tokio::task::spawn_blocking(move || {
        let scope = match &body.recording_id {
            Some(id) => Scope::Recording(Recording::load(&root, id)?.id),
            None => Scope::All,
        };
        let priority = match body.priority_level {
            Some(p) => p,
            None => next_priority(&store.list(&scope)?),
        };

        let mut action = Action::new(body.text.clone(), 1);
        action.recording_id = body.recording_id;
        action.apply(&ActionPatch {
            text: Some(body.text),
            status,
            priority_level: Some(priority),
            start_date: Some(body.start_date),
            target_date: Some(body.target_date),
            end_date: Some(body.end_date),
            assigned_to: Some(body.assigned_to),
            confidence: Some(body.confidence),
            success_criteria: Some(body.success_criteria),
            motivation: Some(body.motivation),
            micro_tasks: Some(body.micro_tasks.into_iter().map(MicroTask::new).collect()),
            ..ActionPatch::default()
        })?;
        store.insert(&action)?;
        cache.put(&action);
        Ok::<_, rhythm_core::RhythmError>(action)
    })
    .await
    .map_err(AppError::join)??;

    app.notify(Change::Actions);
    Ok((StatusCode::CREATED, Json(action_json(&action))))
}

/// PATCH /api/actions/:id: partial update. Carry `expected_version` to have a
/// stale write rejected with 409 instead of overwriting a newer one.
pub async fn patch_action(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ActionPatch>,
) -> Result<Json<serde_json::Value>, AppError> {
    if patch.is_empty() {
        return Err(AppError::bad_request("patch contains no fields"));
    }
    let root = app.root.clone();
    let (store, cache) = (app.store.clone(), app.cache.clone());
    let action = tokio::task::spawn_blocking(move || {
        if let Some(watchers) = &patch.watchers {
            validate_watchers(watchers, &SupportMember::list(&root)?)?;
        }
        let stored = store.update(&id, &patch)?;
        cache.put(&stored);
        Ok::<_, rhythm_core::RhythmError>(stored)
    })
    .await
    .map_err(AppError::join)??;

    app.notify(Change::Actions);
    Ok(Json(action_json(&action)))
}
