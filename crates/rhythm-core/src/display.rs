//! One canonical label/color/icon table for statuses and priorities.
//!
//! Every surface (CLI tables, API, any UI) renders through these functions so
//! the labels cannot drift apart. Lookups never fail: anything unexpected from
//! storage maps to an explicit fallback entry.

use crate::types::ActionStatus;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub value: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

pub const FALLBACK_STATUS: StatusDisplay = StatusDisplay {
    value: "unknown",
    label: "Unknown",
    color: "gray",
    icon: "help-circle",
};

const STATUS_TABLE: [StatusDisplay; 5] = [
    StatusDisplay {
        value: "not_started",
        label: "Not Started",
        color: "slate",
        icon: "circle",
    },
    StatusDisplay {
        value: "doing",
        label: "Doing",
        color: "blue",
        icon: "play-circle",
    },
    StatusDisplay {
        value: "done",
        label: "Done",
        color: "green",
        icon: "check-circle",
    },
    StatusDisplay {
        value: "on_hold",
        label: "On Hold",
        color: "amber",
        icon: "pause-circle",
    },
    StatusDisplay {
        value: "cancelled",
        label: "Cancelled",
        color: "red",
        icon: "x-circle",
    },
];

pub fn status_display(status: &ActionStatus) -> StatusDisplay {
    STATUS_TABLE
        .iter()
        .find(|d| d.value == status.as_str())
        .copied()
        .unwrap_or(FALLBACK_STATUS)
}

/// Lookup by raw string, accepting the same alternate spellings as storage.
pub fn status_display_str(raw: &str) -> StatusDisplay {
    status_display(&ActionStatus::parse_lenient(raw))
}

pub fn status_catalog() -> &'static [StatusDisplay] {
    &STATUS_TABLE
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityDisplay {
    pub level: u32,
    pub label: &'static str,
    pub color: &'static str,
}

pub const FALLBACK_PRIORITY: PriorityDisplay = PriorityDisplay {
    level: 0,
    label: "Unranked",
    color: "gray",
};

pub fn priority_display(level: u32) -> PriorityDisplay {
    let (label, color) = match level {
        1 => ("Urgent", "red"),
        2 => ("High", "orange"),
        3 => ("Medium", "yellow"),
        4 => ("Low", "blue"),
        5 => ("Someday", "slate"),
        _ => return FALLBACK_PRIORITY,
    };
    PriorityDisplay {
        level,
        label,
        color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_label_and_icon() {
        for status in ActionStatus::all() {
            let d = status_display(status);
            assert_ne!(d, FALLBACK_STATUS, "{status} fell through to fallback");
            assert!(!d.label.is_empty());
            assert!(!d.icon.is_empty());
        }
    }

    #[test]
    fn unknown_status_uses_fallback() {
        assert_eq!(status_display_str("unknown_status"), FALLBACK_STATUS);
        assert_eq!(status_display_str(""), FALLBACK_STATUS);
    }

    #[test]
    fn legacy_spelling_resolves() {
        assert_eq!(status_display_str("in_progress").label, "Doing");
        assert_eq!(status_display_str("completed").label, "Done");
    }

    #[test]
    fn priorities_outside_picker_range_fall_back() {
        assert_eq!(priority_display(1).label, "Urgent");
        assert_eq!(priority_display(5).label, "Someday");
        assert_eq!(priority_display(0), FALLBACK_PRIORITY);
        assert_eq!(priority_display(12), FALLBACK_PRIORITY);
    }
}
