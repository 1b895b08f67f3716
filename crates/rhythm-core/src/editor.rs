//! Inline field editor: a value that is shown read-only until clicked, then
//! edited through a kind-specific input and committed or discarded.

use crate::action::{Action, ActionPatch};
use crate::error::{Result, RhythmError};
use crate::types::ActionStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";
pub const DATE_DISPLAY_FORMAT: &str = "%b %-d, %Y";

// ---------------------------------------------------------------------------
// FieldKind / FieldValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    TextArea,
    Select(Vec<String>),
    Date,
    Number,
}

impl FieldKind {
    /// Only single-line text commits on Enter; a text area needs Enter for newlines.
    pub fn commits_on_enter(&self) -> bool {
        matches!(self, FieldKind::Text)
    }

    pub fn commits_on_blur(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Empty,
    Text(String),
    Date(NaiveDate),
    Number(f64),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// The raw string an input box starts with.
    pub fn as_input(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Date(d) => d.format(DATE_INPUT_FORMAT).to_string(),
            FieldValue::Number(n) => format_number(*n),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Display,
    Editing { draft: String },
}

// ---------------------------------------------------------------------------
// FieldEditor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FieldEditor {
    field: String,
    kind: FieldKind,
    value: FieldValue,
    mode: EditorMode,
}

impl FieldEditor {
    pub fn new(field: impl Into<String>, kind: FieldKind, value: FieldValue) -> Self {
        Self {
            field: field.into(),
            kind,
            value,
            mode: EditorMode::Display,
        }
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The last committed value.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, EditorMode::Editing { .. })
    }

    pub fn click(&mut self) {
        if !self.is_editing() {
            self.mode = EditorMode::Editing {
                draft: self.value.as_input(),
            };
        }
    }

    /// Replace the draft. Ignored outside editing.
    pub fn input(&mut self, raw: &str) -> Result<()> {
        let EditorMode::Editing { draft } = &mut self.mode else {
            return Ok(());
        };
        if let FieldKind::Select(options) = &self.kind {
            if !raw.is_empty() && !options.iter().any(|o| o == raw) {
                return Err(RhythmError::InvalidField {
                    field: self.field.clone(),
                    reason: format!("'{raw}' is not one of: {}", options.join(", ")),
                });
            }
        }
        *draft = raw.to_string();
        Ok(())
    }

    /// Handle a key press. Returns `true` when it committed a value.
    pub fn key(&mut self, key: Key, on_save: impl FnMut(FieldValue)) -> Result<bool> {
        match key {
            Key::Enter if self.kind.commits_on_enter() => self.save(on_save),
            Key::Escape => {
                self.cancel();
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Parse the draft, commit it and hand it to `on_save`. A draft that does
    /// not parse keeps the editor open.
    pub fn save(&mut self, mut on_save: impl FnMut(FieldValue)) -> Result<bool> {
        let EditorMode::Editing { draft } = &self.mode else {
            return Ok(false);
        };
        let parsed = self.parse(draft)?;
        self.value = parsed.clone();
        self.mode = EditorMode::Display;
        on_save(parsed);
        Ok(true)
    }

    pub fn cancel(&mut self) {
        self.mode = EditorMode::Display;
    }

    pub fn blur(&mut self, on_save: impl FnMut(FieldValue)) -> Result<bool> {
        if self.is_editing() && self.kind.commits_on_blur() {
            return self.save(on_save);
        }
        Ok(false)
    }

    pub fn display_text(&self, placeholder: &str) -> String {
        match &self.value {
            FieldValue::Empty => placeholder.to_string(),
            FieldValue::Date(d) => d.format(DATE_DISPLAY_FORMAT).to_string(),
            other => other.as_input(),
        }
    }

    fn parse(&self, draft: &str) -> Result<FieldValue> {
        let trimmed = draft.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Empty);
        }
        match self.kind {
            FieldKind::Text | FieldKind::TextArea | FieldKind::Select(_) => {
                Ok(FieldValue::Text(draft.to_string()))
            }
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, DATE_INPUT_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| RhythmError::InvalidField {
                    field: self.field.clone(),
                    reason: format!("'{trimmed}' is not a date (expected YYYY-MM-DD)"),
                }),
            FieldKind::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(|| RhythmError::InvalidField {
                    field: self.field.clone(),
                    reason: format!("'{trimmed}' is not a number"),
                }),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionField
// ---------------------------------------------------------------------------

/// The action columns that can be edited inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionField {
    Text,
    Status,
    Priority,
    StartDate,
    TargetDate,
    EndDate,
    AssignedTo,
    Confidence,
    SuccessCriteria,
    Motivation,
}

impl ActionField {
    pub fn all() -> &'static [ActionField] {
        &[
            ActionField::Text,
            ActionField::Status,
            ActionField::Priority,
            ActionField::StartDate,
            ActionField::TargetDate,
            ActionField::EndDate,
            ActionField::AssignedTo,
            ActionField::Confidence,
            ActionField::SuccessCriteria,
            ActionField::Motivation,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionField::Text => "text",
            ActionField::Status => "status",
            ActionField::Priority => "priority",
            ActionField::StartDate => "start_date",
            ActionField::TargetDate => "target_date",
            ActionField::EndDate => "end_date",
            ActionField::AssignedTo => "assigned_to",
            ActionField::Confidence => "confidence",
            ActionField::SuccessCriteria => "success_criteria",
            ActionField::Motivation => "motivation",
        }
    }

    pub fn kind(self, max_priority: u32) -> FieldKind {
        match self {
            ActionField::Text | ActionField::AssignedTo => FieldKind::Text,
            ActionField::SuccessCriteria | ActionField::Motivation => FieldKind::TextArea,
            ActionField::Status => FieldKind::Select(
                ActionStatus::all()
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            ),
            ActionField::Priority => {
                FieldKind::Select((1..=max_priority).map(|p| p.to_string()).collect())
            }
            ActionField::StartDate | ActionField::TargetDate | ActionField::EndDate => {
                FieldKind::Date
            }
            ActionField::Confidence => FieldKind::Number,
        }
    }

    pub fn current(self, action: &Action) -> FieldValue {
        let opt_text = |s: &Option<String>| s.clone().map(FieldValue::text).unwrap_or(FieldValue::Empty);
        let opt_date = |d: Option<NaiveDate>| d.map(FieldValue::Date).unwrap_or(FieldValue::Empty);
        match self {
            ActionField::Text => FieldValue::text(action.text.clone()),
            ActionField::Status => FieldValue::text(action.status.as_str()),
            ActionField::Priority => FieldValue::text(action.priority_level.to_string()),
            ActionField::StartDate => opt_date(action.start_date),
            ActionField::TargetDate => opt_date(action.target_date),
            ActionField::EndDate => opt_date(action.end_date),
            ActionField::AssignedTo => opt_text(&action.assigned_to),
            ActionField::Confidence => action
                .confidence
                .map(|c| FieldValue::Number(c as f64))
                .unwrap_or(FieldValue::Empty),
            ActionField::SuccessCriteria => opt_text(&action.success_criteria),
            ActionField::Motivation => opt_text(&action.motivation),
        }
    }

    /// An editor primed with the action's current value.
    pub fn editor(self, action: &Action, max_priority: u32) -> FieldEditor {
        FieldEditor::new(self.as_str(), self.kind(max_priority), self.current(action))
    }

    /// Translate a committed value into the single-field write for this column.
    pub fn to_patch(self, value: &FieldValue, max_priority: u32) -> Result<ActionPatch> {
        let invalid = |reason: String| RhythmError::InvalidField {
            field: self.as_str().to_string(),
            reason,
        };
        let opt_text = || value.as_text().map(str::to_string);
        let opt_date = || match value {
            FieldValue::Date(d) => Ok(Some(*d)),
            FieldValue::Empty => Ok(None),
            other => Err(invalid(format!("expected a date, got {other:?}"))),
        };

        let mut patch = ActionPatch::default();
        match self {
            ActionField::Text => {
                let text = opt_text().ok_or_else(|| invalid("action text cannot be empty".into()))?;
                patch.text = Some(text);
            }
            ActionField::Status => {
                let raw = opt_text().ok_or_else(|| invalid("status is required".into()))?;
                patch.status = Some(raw.parse()?);
            }
            ActionField::Priority => {
                let raw = opt_text().ok_or_else(|| invalid("priority is required".into()))?;
                let level: u32 = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("'{raw}' is not a whole number")))?;
                if level == 0 || level > max_priority {
                    return Err(RhythmError::InvalidPriority {
                        value: level as i64,
                        reason: format!("pick a priority between 1 and {max_priority}"),
                    });
                }
                patch.priority_level = Some(level);
            }
            ActionField::StartDate => patch.start_date = Some(opt_date()?),
            ActionField::TargetDate => patch.target_date = Some(opt_date()?),
            ActionField::EndDate => patch.end_date = Some(opt_date()?),
            ActionField::AssignedTo => patch.assigned_to = Some(opt_text()),
            ActionField::Confidence => {
                patch.confidence = Some(match value {
                    FieldValue::Number(n) => Some(*n as f32),
                    FieldValue::Empty => None,
                    other => return Err(invalid(format!("expected a number, got {other:?}"))),
                });
            }
            ActionField::SuccessCriteria => patch.success_criteria = Some(opt_text()),
            ActionField::Motivation => patch.motivation = Some(opt_text()),
        }
        patch.validate()?;
        Ok(patch)
    }
}

impl std::fmt::Display for ActionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionField {
    type Err = RhythmError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace('-', "_");
        ActionField::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized || (normalized == "priority_level" && *f == ActionField::Priority))
            .ok_or_else(|| RhythmError::InvalidField {
                field: s.to_string(),
                reason: "not an editable action field".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
