use crate::action::Action;
use crate::error::{Result, RhythmError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// DragEnd
// ---------------------------------------------------------------------------

/// The result of a drag gesture. `destination` is `None` when the item was
/// dropped outside the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragEnd {
    pub source: usize,
    pub destination: Option<usize>,
}

impl DragEnd {
    pub fn new(source: usize, destination: usize) -> Self {
        Self {
            source,
            destination: Some(destination),
        }
    }
}

/// One row whose priority moved during a renumber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityChange {
    pub action_id: String,
    pub from: u32,
    pub to: u32,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Move one item from `source` to `destination` (remove, then insert).
///
/// Returns `Ok(false)` without touching the list when there is no destination
/// or the item is dropped where it started.
pub fn move_item<T>(list: &mut Vec<T>, source: usize, destination: Option<usize>) -> Result<bool> {
    let Some(destination) = destination else {
        return Ok(false);
    };
    if source >= list.len() || destination >= list.len() {
        return Err(RhythmError::InvalidMove {
            source_index: source,
            destination,
            len: list.len(),
        });
    }
    if source == destination {
        return Ok(false);
    }
    let item = list.remove(source);
    list.insert(destination, item);
    Ok(true)
}

/// Assign `index + 1` to every action and report the ones that changed.
pub fn renumber(actions: &mut [Action]) -> Vec<PriorityChange> {
    let mut changes = Vec::new();
    for (index, action) in actions.iter_mut().enumerate() {
        let level = index as u32 + 1;
        if action.priority_level != level {
            changes.push(PriorityChange {
                action_id: action.id.clone(),
                from: action.priority_level,
                to: level,
            });
            action.priority_level = level;
        }
    }
    changes
}

/// Apply a drag to the list and renumber. An empty result means nothing moved.
pub fn apply_drag(actions: &mut Vec<Action>, drag: DragEnd) -> Result<Vec<PriorityChange>> {
    if !move_item(actions, drag.source, drag.destination)? {
        return Ok(Vec::new());
    }
    Ok(renumber(actions))
}

/// Replace the order with `ordered_ids` (each current id exactly once) and renumber.
pub fn reorder_by_ids(actions: &mut Vec<Action>, ordered_ids: &[&str]) -> Result<Vec<PriorityChange>> {
    let mut seen = HashSet::new();
    for &id in ordered_ids {
        if !seen.insert(id) {
            return Err(RhythmError::InvalidOrder(format!(
                "duplicate id in order list: '{id}'"
            )));
        }
    }

    let existing: HashSet<&str> = actions.iter().map(|a| a.id.as_str()).collect();
    for &id in ordered_ids {
        if !existing.contains(id) {
            return Err(RhythmError::InvalidOrder(format!(
                "'{id}' is not in this list"
            )));
        }
    }
    for a in actions.iter() {
        if !seen.contains(a.id.as_str()) {
            return Err(RhythmError::InvalidOrder(format!(
                "missing id in order list: '{}'",
                a.id
            )));
        }
    }

    let mut remaining = std::mem::take(actions);
    for &id in ordered_ids {
        if let Some(pos) = remaining.iter().position(|a| a.id == id) {
            actions.push(remaining.swap_remove(pos));
        }
    }
    Ok(renumber(actions))
}

/// True when priorities read exactly `1..=N` in list order.
pub fn is_dense(actions: &[Action]) -> bool {
    actions
        .iter()
        .enumerate()
        .all(|(i, a)| a.priority_level == i as u32 + 1)
}

/// Next priority for an item appended after `actions`.
pub fn next_priority(actions: &[Action]) -> u32 {
    actions.iter().map(|a| a.priority_level).max().unwrap_or(0) + 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
