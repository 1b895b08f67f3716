use crate::error::{Result, RhythmError};
use crate::paths;
use crate::types::ActionStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// MicroTask
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroTask {
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl MicroTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A single commitment, either extracted from a recording or entered by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(default)]
    pub recording_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub status: ActionStatus,
    pub priority_level: u32,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub watchers: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub success_criteria: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub micro_tasks: Vec<MicroTask>,
    /// Incremented by the store on every persisted write.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Action {
    pub fn new(text: impl Into<String>, priority_level: u32) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recording_id: None,
            text: text.into(),
            status: ActionStatus::NotStarted,
            priority_level: priority_level.max(1),
            start_date: None,
            target_date: None,
            end_date: None,
            assigned_to: None,
            watchers: Vec::new(),
            confidence: None,
            success_criteria: None,
            motivation: None,
            micro_tasks: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_recording(mut self, recording_id: impl Into<String>) -> Self {
        self.recording_id = Some(recording_id.into());
        self
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path, id: &str) -> Result<Self> {
        if id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(RhythmError::ActionNotFound(id.to_string()));
        }
        crate::io::read_yaml(&paths::action_path(root, id))?
            .ok_or_else(|| RhythmError::ActionNotFound(id.to_string()))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::action_path(root, &self.id), self)
    }

    /// Every action on disk, in display order.
    pub fn list(root: &Path) -> Result<Vec<Self>> {
        let mut actions = Vec::new();
        for id in crate::io::yaml_stems(&paths::actions_dir(root))? {
            actions.push(Self::load(root, &id)?);
        }
        sort_for_display(&mut actions);
        Ok(actions)
    }

    pub fn list_for_recording(root: &Path, recording_id: &str) -> Result<Vec<Self>> {
        let mut actions = Self::list(root)?;
        actions.retain(|a| a.recording_id.as_deref() == Some(recording_id));
        Ok(actions)
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    /// Apply a partial update. Validation happens before any field changes, so
    /// a rejected patch leaves the action untouched.
    pub fn apply(&mut self, patch: &ActionPatch) -> Result<()> {
        patch.validate()?;

        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
        if let Some(priority) = patch.priority_level {
            self.priority_level = priority;
        }
        if let Some(d) = patch.start_date {
            self.start_date = d;
        }
        if let Some(d) = patch.target_date {
            self.target_date = d;
        }
        if let Some(d) = patch.end_date {
            self.end_date = d;
        }
        if let Some(a) = &patch.assigned_to {
            self.assigned_to = a.clone();
        }
        if let Some(w) = &patch.watchers {
            self.watchers = w.clone();
        }
        if let Some(c) = patch.confidence {
            self.confidence = c;
        }
        if let Some(s) = &patch.success_criteria {
            self.success_criteria = s.clone();
        }
        if let Some(m) = &patch.motivation {
            self.motivation = m.clone();
        }
        if let Some(t) = &patch.micro_tasks {
            self.micro_tasks = t.clone();
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn add_micro_task(&mut self, text: impl Into<String>) -> usize {
        self.micro_tasks.push(MicroTask::new(text));
        self.updated_at = Utc::now();
        self.micro_tasks.len() - 1
    }

    /// Flip the completion flag of the micro-task at `index`; returns the new flag.
    pub fn toggle_micro_task(&mut self, index: usize) -> Result<bool> {
        let len = self.micro_tasks.len();
        let task = self
            .micro_tasks
            .get_mut(index)
            .ok_or_else(|| RhythmError::InvalidField {
                field: "micro_tasks".to_string(),
                reason: format!("no micro-task at index {index} (have {len})"),
            })?;
        task.done = !task.done;
        self.updated_at = Utc::now();
        Ok(task.done)
    }

    /// "2/3" style progress across micro-tasks, `None` when there are none.
    pub fn micro_task_progress(&self) -> Option<String> {
        if self.micro_tasks.is_empty() {
            return None;
        }
        let done = self.micro_tasks.iter().filter(|t| t.done).count();
        Some(format!("{done}/{}", self.micro_tasks.len()))
    }
}

/// Lower priority first; ties keep creation order.
pub fn sort_for_display(actions: &mut [Action]) {
    actions.sort_by(|a, b| {
        a.priority_level
            .cmp(&b.priority_level)
            .then(a.created_at.cmp(&b.created_at))
    });
}

// ---------------------------------------------------------------------------
// ActionPatch
// ---------------------------------------------------------------------------

/// Distinguishes "field absent" (`None`) from "field set to null" (`Some(None)`).
fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Partial update of an action. Absent fields are left alone; nullable fields
/// use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ActionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_level: Option<u32>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchers: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<Option<f32>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub success_criteria: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub motivation: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micro_tasks: Option<Vec<MicroTask>>,
    /// When set, the store refuses the write unless the stored row is still at
    /// this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl ActionPatch {
    /// The single-column write issued once per reordered row.
    pub fn priority(level: u32) -> Self {
        Self {
            priority_level: Some(level),
            ..Self::default()
        }
    }

    pub fn status(status: ActionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn watchers(watchers: Vec<String>) -> Self {
        Self {
            watchers: Some(watchers),
            ..Self::default()
        }
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields this patch touches, for logging.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.text.is_some() {
            fields.push("text");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.priority_level.is_some() {
            fields.push("priority_level");
        }
        if self.start_date.is_some() {
            fields.push("start_date");
        }
        if self.target_date.is_some() {
            fields.push("target_date");
        }
        if self.end_date.is_some() {
            fields.push("end_date");
        }
        if self.assigned_to.is_some() {
            fields.push("assigned_to");
        }
        if self.watchers.is_some() {
            fields.push("watchers");
        }
        if self.confidence.is_some() {
            fields.push("confidence");
        }
        if self.success_criteria.is_some() {
            fields.push("success_criteria");
        }
        if self.motivation.is_some() {
            fields.push("motivation");
        }
        if self.micro_tasks.is_some() {
            fields.push("micro_tasks");
        }
        fields
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ActionStatus::Unrecognized(raw)) = &self.status {
            return Err(RhythmError::InvalidStatus(raw.clone()));
        }
        if let Some(0) = self.priority_level {
            return Err(RhythmError::InvalidPriority {
                value: 0,
                reason: "priority must be a positive integer".to_string(),
            });
        }
        if let Some(Some(c)) = self.confidence {
            if !(0.0..=1.0).contains(&c) || c.is_nan() {
                return Err(RhythmError::InvalidConfidence(c));
            }
        }
        if let Some(text) = &self.text {
            if text.trim().is_empty() {
                return Err(RhythmError::InvalidField {
                    field: "text".to_string(),
                    reason: "action text cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_load_list_in_priority_order() {
        let dir = TempDir::new().unwrap();
        let low = Action::new("Call the pharmacy", 3);
        let high = Action::new("Book neurology follow-up", 1);
        low.save(dir.path()).unwrap();
        high.save(dir.path()).unwrap();

        let loaded = Action::load(dir.path(), &high.id).unwrap();
        assert_eq!(loaded, high);

        let listed = Action::list(dir.path()).unwrap();
        assert_eq!(listed[0].id, high.id);
        assert_eq!(listed[1].id, low.id);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Action::load(dir.path(), "ghost"),
            Err(RhythmError::ActionNotFound(_))
        ));
        assert!(matches!(
            Action::load(dir.path(), "../config"),
            Err(RhythmError::ActionNotFound(_))
        ));
    }

    #[test]
    fn list_for_recording_filters() {
        let dir = TempDir::new().unwrap();
        Action::new("a", 1).with_recording("weekly").save(dir.path()).unwrap();
        Action::new("b", 1).save(dir.path()).unwrap();
        let scoped = Action::list_for_recording(dir.path(), "weekly").unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].text, "a");
    }

    #[test]
    fn patch_clears_nullable_fields() {
        let mut action = Action::new("Walk", 1);
        action.assigned_to = Some("me".to_string());

        let patch: ActionPatch = serde_json::from_str(r#"{"assigned_to": null}"#).unwrap();
        assert_eq!(patch.assigned_to, Some(None));
        action.apply(&patch).unwrap();
        assert!(action.assigned_to.is_none());

        let untouched: ActionPatch = serde_json::from_str("{}").unwrap();
        assert!(untouched.is_empty());
    }

    #[test]
    fn patch_rejects_zero_priority_without_mutating() {
        let mut action = Action::new("Walk", 2);
        let patch = ActionPatch {
            text: Some("Run".to_string()),
            priority_level: Some(0),
            ..ActionPatch::default()
        };
        assert!(matches!(
            action.apply(&patch),
            Err(RhythmError::InvalidPriority { .. })
        ));
        assert_eq!(action.text, "Walk");
        assert_eq!(action.priority_level, 2);
    }

    #[test]
    fn patch_rejects_out_of_range_confidence() {
        let mut action = Action::new("Walk", 1);
        let patch = ActionPatch {
            confidence: Some(Some(1.5)),
            ..ActionPatch::default()
        };
        assert!(matches!(
            action.apply(&patch),
            Err(RhythmError::InvalidConfidence(_))
        ));
    }

    #[test]
    fn patch_rejects_unknown_status_without_mutating() {
        let mut action = Action::new("Walk", 1);
        let patch: ActionPatch =
            serde_json::from_str(r#"{"status":"whatever","text":"Run"}"#).unwrap();
        assert!(matches!(
            action.apply(&patch),
            Err(RhythmError::InvalidStatus(raw)) if raw == "whatever"
        ));
        assert_eq!(action.status, ActionStatus::NotStarted);
        assert_eq!(action.text, "Walk");
    }

    #[test]
    fn micro_tasks_toggle_and_progress() {
        let mut action = Action::new("Prepare for appointment", 1);
        assert!(action.micro_task_progress().is_none());
        action.add_micro_task("Write down questions");
        action.add_micro_task("Bring medication list");
        assert!(action.toggle_micro_task(1).unwrap());
        assert_eq!(action.micro_task_progress().as_deref(), Some("1/2"));
        assert!(!action.toggle_micro_task(1).unwrap());
        assert!(action.toggle_micro_task(5).is_err());
    }
}
