use crate::action::Action;
use crate::error::{Result, RhythmError};
use crate::order::next_priority;
use crate::paths;
use crate::persist::{ActionStore, Scope};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// A recorded conversation that actions are extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub title: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub processed: bool,
}

impl Recording {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            recorded_at: Utc::now(),
            duration_secs: None,
            participants: Vec::new(),
            transcript: None,
            processed: false,
        }
    }

    pub fn create(root: &Path, recording: Recording) -> Result<Self> {
        paths::validate_id(&recording.id)?;
        if paths::recording_path(root, &recording.id).exists() {
            return Err(RhythmError::RecordingExists(recording.id));
        }
        recording.save(root)?;
        Ok(recording)
    }

    pub fn load(root: &Path, id: &str) -> Result<Self> {
        if paths::validate_id(id).is_err() {
            return Err(RhythmError::RecordingNotFound(id.to_string()));
        }
        crate::io::read_yaml(&paths::recording_path(root, id))?
            .ok_or_else(|| RhythmError::RecordingNotFound(id.to_string()))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::recording_path(root, &self.id), self)
    }

    /// Newest first.
    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let mut recordings = Vec::new();
        for id in crate::io::yaml_stems(&paths::recordings_dir(root))? {
            recordings.push(Self::load(root, &id)?);
        }
        recordings.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then_with(|| a.id.cmp(&b.id)));
        Ok(recordings)
    }

    pub fn mark_processed(&mut self) {
        self.processed = true;
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// One action as produced by the external extraction step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAction {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

/// Append extracted actions to a recording, after any it already has, and
/// mark the recording processed. Nothing is written if any entry is invalid.
pub fn import_actions<S: ActionStore + ?Sized>(
    root: &Path,
    store: &S,
    recording_id: &str,
    extracted: Vec<ExtractedAction>,
) -> Result<Vec<Action>> {
    let mut recording = Recording::load(root, recording_id)?;
    let existing = store.list(&Scope::Recording(recording.id.clone()))?;
    let first = next_priority(&existing);

    let mut actions = Vec::with_capacity(extracted.len());
    for (offset, item) in extracted.into_iter().enumerate() {
        if item.text.trim().is_empty() {
            return Err(RhythmError::InvalidField {
                field: "text".to_string(),
                reason: format!("extracted action {} has no text", offset + 1),
            });
        }
        if let Some(c) = item.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(RhythmError::InvalidConfidence(c));
            }
        }
        let mut action = Action::new(item.text, first + offset as u32).with_recording(&recording.id);
        action.confidence = item.confidence;
        action.assigned_to = item.assigned_to;
        action.target_date = item.target_date;
        actions.push(action);
    }

    for action in &actions {
        store.insert(action)?;
    }
    recording.mark_processed();
    recording.save(root)?;
    tracing::info!(recording = %recording.id, imported = actions.len(), "actions imported");
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::is_dense;
    use crate::persist::FileStore;
    use tempfile::TempDir;

    fn extracted(text: &str) -> ExtractedAction {
        ExtractedAction {
            text: text.to_string(),
            confidence: Some(0.8),
            assigned_to: None,
            target_date: None,
        }
    }

    #[test]
    fn create_and_list_recordings() {
        let dir = TempDir::new().unwrap();
        Recording::create(dir.path(), Recording::new("weekly-checkin", "Weekly check-in")).unwrap();
        assert!(matches!(
            Recording::create(dir.path(), Recording::new("weekly-checkin", "again")),
            Err(RhythmError::RecordingExists(_))
        ));
        assert!(matches!(
            Recording::create(dir.path(), Recording::new("Bad Id", "x")),
            Err(RhythmError::InvalidId(_))
        ));
        assert_eq!(Recording::list(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn import_continues_priorities() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        Recording::create(dir.path(), Recording::new("visit", "Doctor visit")).unwrap();

        import_actions(dir.path(), &store, "visit", vec![extracted("a"), extracted("b")]).unwrap();
        let second = import_actions(dir.path(), &store, "visit", vec![extracted("c")]).unwrap();
        assert_eq!(second[0].priority_level, 3);

        let list = store.list(&Scope::Recording("visit".into())).unwrap();
        assert_eq!(list.len(), 3);
        assert!(is_dense(&list));
        assert!(Recording::load(dir.path(), "visit").unwrap().processed);
    }

    #[test]
    fn invalid_confidence_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        Recording::create(dir.path(), Recording::new("visit", "Doctor visit")).unwrap();
        let mut bad = extracted("b");
        bad.confidence = Some(1.5);

        assert!(matches!(
            import_actions(dir.path(), &store, "visit", vec![extracted("a"), bad]),
            Err(RhythmError::InvalidConfidence(_))
        ));
        assert!(store.list(&Scope::All).unwrap().is_empty());
        assert!(!Recording::load(dir.path(), "visit").unwrap().processed);
    }

    #[test]
    fn import_into_unknown_recording_fails() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            import_actions(dir.path(), &store, "nope", vec![extracted("a")]),
            Err(RhythmError::RecordingNotFound(_))
        ));
    }
}
