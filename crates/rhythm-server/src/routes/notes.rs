use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rhythm_core::note::{self, ActionNote};
use rhythm_core::types::NoteType;

use crate::error::AppError;
use crate::routes::events::Change;
use crate::state::AppState;

#[derive(serde::Deserialize, Default)]
pub struct ListNotesQuery {
    /// Include notes hidden from the action's owner.
    #[serde(default)]
    pub all: bool,
}

/// GET /api/actions/:id/notes
pub async fn list_notes(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<Vec<ActionNote>>, AppError> {
    let root = app.root.clone();
    let notes = tokio::task::spawn_blocking(move || note::list_notes(&root, &id, !query.all))
        .await
        .map_err(AppError::join)??;
    Ok(Json(notes))
}

#[derive(serde::Deserialize)]
pub struct AddNoteBody {
    pub member_id: String,
    #[serde(default = "default_note_type")]
    pub note_type: String,
    pub body: String,
    #[serde(default = "default_visible")]
    pub visible_to_user: bool,
}

fn default_note_type() -> String {
    NoteType::Comment.as_str().to_string()
}

fn default_visible() -> bool {
    true
}

/// POST /api/actions/:id/notes: a support-circle member comments on an action.
pub async fn add_note(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AddNoteBody>,
) -> Result<(StatusCode, Json<ActionNote>), AppError> {
    let note_type: NoteType = body.note_type.parse()?;
    let root = app.root.clone();
    let created = tokio::task::spawn_blocking(move || {
        note::add_note(
            &root,
            &id,
            &body.member_id,
            note_type,
            body.body,
            body.visible_to_user,
        )
    })
    .await
    .map_err(AppError::join)??;

    app.notify(Change::Notes);
    Ok((StatusCode::CREATED, Json(created)))
}
