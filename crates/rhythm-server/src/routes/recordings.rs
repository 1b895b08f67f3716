use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rhythm_core::config::Config;
use rhythm_core::order::DragEnd;
use rhythm_core::persist::Scope;
use rhythm_core::recording::{self, ExtractedAction, Recording};
use rhythm_core::viewer::ActionViewer;
use rhythm_core::RhythmError;

use crate::error::AppError;
use crate::routes::actions::actions_json;
use crate::routes::events::Change;
use crate::state::AppState;

/// GET /api/recordings: newest first.
pub async fn list_recordings(State(app): State<AppState>) -> Result<Json<Vec<Recording>>, AppError> {
    let root = app.root.clone();
    let recordings = tokio::task::spawn_blocking(move || Recording::list(&root))
        .await
        .map_err(AppError::join)??;
    Ok(Json(recordings))
}

#[derive(serde::Deserialize)]
pub struct CreateRecordingBody {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

/// POST /api/recordings
pub async fn create_recording(
    State(app): State<AppState>,
    Json(body): Json<CreateRecordingBody>,
) -> Result<(StatusCode, Json<Recording>), AppError> {
    let root = app.root.clone();
    let created = tokio::task::spawn_blocking(move || {
        let mut rec = Recording::new(body.id, body.title);
        if let Some(at) = body.recorded_at {
            rec.recorded_at = at;
        }
        rec.duration_secs = body.duration_secs;
        rec.participants = body.participants;
        rec.transcript = body.transcript;
        Recording::create(&root, rec)
    })
    .await
    .map_err(AppError::join)??;

    app.notify(Change::Recordings);
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/recordings/:id
pub async fn get_recording(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let (store, cache) = (app.store.clone(), app.cache.clone());
    let result = tokio::task::spawn_blocking(move || {
        let rec = Recording::load(&root, &id)?;
        let actions = cache.scope(&*store, &Scope::Recording(rec.id.clone()))?;
        Ok::<_, RhythmError>(serde_json::json!({
            "recording": rec,
            "action_count": actions.len(),
        }))
    })
    .await
    .map_err(AppError::join)??;
    Ok(Json(result))
}

/// GET /api/recordings/:id/actions: the recording's actions in priority order.
pub async fn list_recording_actions(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let (store, cache) = (app.store.clone(), app.cache.clone());
    let actions = tokio::task::spawn_blocking(move || {
        let rec = Recording::load(&root, &id)?;
        cache.scope(&*store, &Scope::Recording(rec.id))
    })
    .await
    .map_err(AppError::join)??;
    Ok(Json(serde_json::json!(actions_json(&actions))))
}

#[derive(serde::Deserialize)]
pub struct ImportBody {
    pub actions: Vec<ExtractedAction>,
}

/// POST /api/recordings/:id/actions/import: accept the output of the
/// extraction step.
pub async fn import_recording_actions(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ImportBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let root = app.root.clone();
    let (store, cache) = (app.store.clone(), app.cache.clone());
    let imported = tokio::task::spawn_blocking(move || {
        let imported = recording::import_actions(&root, &*store, &id, body.actions)?;
        cache.put_all(&imported);
        Ok::<_, RhythmError>(imported)
    })
    .await
    .map_err(AppError::join)??;

    app.notify(Change::Actions);
    Ok((StatusCode::CREATED, Json(serde_json::json!(actions_json(&imported)))))
}

/// Either a single drag (`source`, optional `destination`) or a full `order`.
#[derive(serde::Deserialize)]
pub struct ReorderBody {
    #[serde(default)]
    pub source: Option<usize>,
    #[serde(default)]
    pub destination: Option<usize>,
    #[serde(default)]
    pub order: Option<Vec<String>>,
}

/// PUT /api/recordings/:id/actions/order: move actions and persist the new
/// priorities. A failed write answers 422 with the list as it now stands.
pub async fn reorder_recording_actions(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReorderBody>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if body.order.is_none() && body.source.is_none() {
        return Err(AppError::bad_request("expected either `order` or `source`"));
    }
    let root = app.root.clone();
    let (store, cache) = (app.store.clone(), app.cache.clone());
    let (outcome, actions) = tokio::task::spawn_blocking(move || {
        let rec = Recording::load(&root, &id)?;
        let config = Config::load(&root)?;
        let mut viewer = ActionViewer::from_config(Scope::Recording(rec.id), &config);
        viewer.open_cached(&cache, &*store)?;

        let outcome = match (&body.order, body.source) {
            (Some(order), _) => {
                let refs: Vec<&str> = order.iter().map(String::as_str).collect();
                viewer.reorder(&*store, &refs)?
            }
            (None, Some(source)) => viewer.drag(
                &*store,
                DragEnd {
                    source,
                    destination: body.destination,
                },
            )?,
            (None, None) => {
                return Err(RhythmError::InvalidOrder("nothing to move".to_string()));
            }
        };

        if outcome.notice.is_success() {
            cache.put_all(viewer.actions());
        } else {
            cache.invalidate_all();
        }
        Ok::<_, RhythmError>((outcome, viewer.into_actions()))
    })
    .await
    .map_err(AppError::join)??;

    if outcome.written > 0 {
        app.notify(Change::Actions);
    }
    let status = if outcome.notice.is_success() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((
        status,
        Json(serde_json::json!({
            "notice": outcome.notice,
            "written": outcome.written,
            "rolled_back": outcome.rolled_back,
            "error": outcome.error,
            "actions": actions_json(&actions),
        })),
    ))
}
