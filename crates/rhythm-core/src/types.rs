use crate::error::RhythmError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ActionStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of an action.
///
/// Values written by older clients or other tools may not match any canonical
/// status; they are kept verbatim in `Unrecognized` so a row never fails to
/// load and is written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionStatus {
    #[default]
    NotStarted,
    Doing,
    Done,
    OnHold,
    Cancelled,
    Unrecognized(String),
}

impl ActionStatus {
    pub fn all() -> &'static [ActionStatus] {
        &[
            ActionStatus::NotStarted,
            ActionStatus::Doing,
            ActionStatus::Done,
            ActionStatus::OnHold,
            ActionStatus::Cancelled,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionStatus::NotStarted => "not_started",
            ActionStatus::Doing => "doing",
            ActionStatus::Done => "done",
            ActionStatus::OnHold => "on_hold",
            ActionStatus::Cancelled => "cancelled",
            ActionStatus::Unrecognized(raw) => raw,
        }
    }

    /// Map a raw value, including the alternate spellings used by older
    /// display sets, to a canonical status. Unknown strings are preserved.
    pub fn parse_lenient(raw: &str) -> ActionStatus {
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "not_started" | "pending" | "todo" => ActionStatus::NotStarted,
            "doing" | "in_progress" | "started" => ActionStatus::Doing,
            "done" | "completed" | "complete" => ActionStatus::Done,
            "on_hold" | "blocked" | "paused" => ActionStatus::OnHold,
            "cancelled" | "canceled" | "dropped" => ActionStatus::Cancelled,
            _ => ActionStatus::Unrecognized(raw.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ActionStatus::Unrecognized(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ActionStatus::Done | ActionStatus::Cancelled)
    }
}

impl From<String> for ActionStatus {
    fn from(raw: String) -> Self {
        ActionStatus::parse_lenient(&raw)
    }
}

impl From<ActionStatus> for String {
    fn from(status: ActionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse for user input: unknown values are rejected.
impl std::str::FromStr for ActionStatus {
    type Err = RhythmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match ActionStatus::parse_lenient(s) {
            ActionStatus::Unrecognized(raw) => Err(RhythmError::InvalidStatus(raw)),
            status => Ok(status),
        }
    }
}

// ---------------------------------------------------------------------------
// MemberRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Family,
    Friend,
    Medical,
    Caregiver,
    Other,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Family => "family",
            MemberRole::Friend => "friend",
            MemberRole::Medical => "medical",
            MemberRole::Caregiver => "caregiver",
            MemberRole::Other => "other",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemberRole {
    type Err = RhythmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "family" => Ok(MemberRole::Family),
            "friend" => Ok(MemberRole::Friend),
            "medical" | "doctor" | "clinician" => Ok(MemberRole::Medical),
            "caregiver" => Ok(MemberRole::Caregiver),
            "other" => Ok(MemberRole::Other),
            _ => Err(RhythmError::InvalidField {
                field: "role".to_string(),
                reason: format!(
                    "unknown role '{s}' (valid: family, friend, medical, caregiver, other)"
                ),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// NoteType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Comment,
    Encouragement,
    Question,
    Concern,
}

impl NoteType {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Comment => "comment",
            NoteType::Encouragement => "encouragement",
            NoteType::Question => "question",
            NoteType::Concern => "concern",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NoteType {
    type Err = RhythmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(NoteType::Comment),
            "encouragement" => Ok(NoteType::Encouragement),
            "question" => Ok(NoteType::Question),
            "concern" => Ok(NoteType::Concern),
            _ => Err(RhythmError::InvalidField {
                field: "note_type".to_string(),
                reason: format!(
                    "unknown note type '{s}' (valid: comment, encouragement, question, concern)"
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternate_spellings_map_to_canonical() {
        assert_eq!(ActionStatus::parse_lenient("pending"), ActionStatus::NotStarted);
        assert_eq!(ActionStatus::parse_lenient("in-progress"), ActionStatus::Doing);
        assert_eq!(ActionStatus::parse_lenient("Completed"), ActionStatus::Done);
        assert_eq!(ActionStatus::parse_lenient("blocked"), ActionStatus::OnHold);
        assert_eq!(ActionStatus::parse_lenient("canceled"), ActionStatus::Cancelled);
    }

    #[test]
    fn unknown_status_survives_yaml_round_trip() {
        let status: ActionStatus = serde_yaml::from_str("snoozed").unwrap();
        assert_eq!(status, ActionStatus::Unrecognized("snoozed".to_string()));
        let out = serde_yaml::to_string(&status).unwrap();
        assert_eq!(out.trim(), "snoozed");
    }

    #[test]
    fn strict_parse_rejects_unknown() {
        assert!("on_hold".parse::<ActionStatus>().is_ok());
        assert!(matches!(
            "whenever".parse::<ActionStatus>(),
            Err(RhythmError::InvalidStatus(_))
        ));
    }

    #[test]
    fn canonical_serialization_is_snake_case() {
        let json = serde_json::to_string(&ActionStatus::OnHold).unwrap();
        assert_eq!(json, "\"on_hold\"");
    }
}
