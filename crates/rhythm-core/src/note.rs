use crate::action::Action;
use crate::circle::SupportMember;
use crate::error::{Result, RhythmError};
use crate::paths;
use crate::types::NoteType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

/// Serialises read-modify-write of notes files within the process.
static NOTES_LOCK: Mutex<()> = Mutex::new(());

/// A comment left on an action by a support-circle member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNote {
    pub id: String,
    pub action_id: String,
    pub member_id: String,
    pub note_type: NoteType,
    pub body: String,
    /// Hidden notes are kept for the circle but not shown to the action's owner.
    #[serde(default = "default_visible")]
    pub visible_to_user: bool,
    pub created_at: DateTime<Utc>,
}

fn default_visible() -> bool {
    true
}

fn load_all(root: &Path, action_id: &str) -> Result<Vec<ActionNote>> {
    Ok(crate::io::read_yaml(&paths::notes_path(root, action_id))?.unwrap_or_default())
}

/// Append a note. The action must exist and the author must be an active member.
pub fn add_note(
    root: &Path,
    action_id: &str,
    member_id: &str,
    note_type: NoteType,
    body: impl Into<String>,
    visible_to_user: bool,
) -> Result<ActionNote> {
    let body = body.into();
    if body.trim().is_empty() {
        return Err(RhythmError::InvalidField {
            field: "body".to_string(),
            reason: "note body cannot be empty".to_string(),
        });
    }
    let action = Action::load(root, action_id)?;
    let member = SupportMember::load(root, member_id)?;
    if !member.active {
        return Err(RhythmError::MemberInactive(member.id));
    }

    let note = ActionNote {
        id: uuid::Uuid::new_v4().to_string(),
        action_id: action.id.clone(),
        member_id: member.id,
        note_type,
        body,
        visible_to_user,
        created_at: Utc::now(),
    };
    let _guard = NOTES_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let mut notes = load_all(root, &action.id)?;
    notes.push(note.clone());
    crate::io::write_yaml(&paths::notes_path(root, &action.id), &notes)?;
    tracing::debug!(action = %action.id, note = %note.id, kind = %note.note_type, "note added");
    Ok(note)
}

/// Notes on one action in the order they were written.
pub fn list_notes(root: &Path, action_id: &str, visible_only: bool) -> Result<Vec<ActionNote>> {
    let action = Action::load(root, action_id)?;
    let mut notes = load_all(root, &action.id)?;
    if visible_only {
        notes.retain(|n| n.visible_to_user);
    }
    Ok(notes)
}
