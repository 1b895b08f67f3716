//! The owner of one on-screen action list.
//!
//! An [`ActionViewer`] fetches the actions for a [`Scope`], applies every
//! change to its in-memory list first and then writes the change back
//! through an [`ActionStore`] using the configured [`PersistMode`]. Work that
//! finishes after the viewer was closed is dropped via its [`Liveness`] token.

use crate::action::{sort_for_display, Action, ActionPatch};
use crate::cache::ActionCache;
use crate::circle::SupportMember;
use crate::config::Config;
use crate::editor::{ActionField, FieldValue};
use crate::error::{Result, RhythmError};
use crate::order::{self, DragEnd};
use crate::persist::{priority_writes, write_back, ActionStore, PersistMode, Scope, WriteOutcome};
use crate::types::ActionStatus;
use crate::watcher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

/// Shared flag tied to a viewer's lifetime. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Default for Liveness {
    fn default() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Run `f` only while the owner is still open.
    pub fn guard<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        if self.is_alive() {
            Some(f())
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// ActionViewer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ActionViewer {
    scope: Scope,
    mode: PersistMode,
    max_priority: u32,
    actions: Vec<Action>,
    liveness: Liveness,
}

impl ActionViewer {
    pub fn new(scope: Scope, mode: PersistMode, max_priority: u32) -> Self {
        Self {
            scope,
            mode,
            max_priority,
            actions: Vec::new(),
            liveness: Liveness::new(),
        }
    }

    pub fn from_config(scope: Scope, config: &Config) -> Self {
        Self::new(scope, config.persistence.mode, config.priorities.max_manual)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    /// A token that async work started by this viewer checks before touching it.
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn close(&self) {
        self.liveness.close();
    }

    /// Fetch the list. Returns `false` if the viewer was closed before the
    /// fetch came back, in which case nothing is applied.
    pub fn open<S: ActionStore + ?Sized>(&mut self, store: &S) -> Result<bool> {
        let fetched = store.list(&self.scope)?;
        Ok(self.accept(fetched))
    }

    pub fn open_cached<S: ActionStore + ?Sized>(&mut self, cache: &ActionCache, store: &S) -> Result<bool> {
        let fetched = cache.scope(store, &self.scope)?;
        Ok(self.accept(fetched))
    }

    pub fn refresh<S: ActionStore + ?Sized>(&mut self, store: &S) -> Result<bool> {
        self.open(store)
    }

    /// Install a list fetched elsewhere, unless the viewer has been closed.
    pub fn accept(&mut self, mut fetched: Vec<Action>) -> bool {
        if !self.liveness.is_alive() {
            tracing::debug!(scope = %self.scope, "viewer closed, dropping fetched list");
            return false;
        }
        fetched.retain(|a| self.scope.contains(a));
        sort_for_display(&mut fetched);
        self.actions = fetched;
        true
    }

    fn ensure_open(&self) -> Result<()> {
        if self.liveness.is_alive() {
            Ok(())
        } else {
            Err(RhythmError::InvalidOrder(format!(
                "viewer for {} is closed",
                self.scope
            )))
        }
    }

    // -----------------------------------------------------------------------
    // Reordering
    // -----------------------------------------------------------------------

    /// Apply a drag and persist the new priorities.
    pub fn drag<S: ActionStore + ?Sized>(&mut self, store: &S, drag: DragEnd) -> Result<WriteOutcome> {
        self.ensure_open()?;
        let snapshot = self.actions.clone();
        let changes = order::apply_drag(&mut self.actions, drag)?;
        let writes = self.versioned(priority_writes(&changes), &snapshot);
        Ok(write_back(store, &mut self.actions, snapshot, &writes, self.mode, "action order"))
    }

    /// Replace the whole order and persist the new priorities.
    pub fn reorder<S: ActionStore + ?Sized>(&mut self, store: &S, ordered_ids: &[&str]) -> Result<WriteOutcome> {
        self.ensure_open()?;
        let snapshot = self.actions.clone();
        let changes = order::reorder_by_ids(&mut self.actions, ordered_ids)?;
        let writes = self.versioned(priority_writes(&changes), &snapshot);
        Ok(write_back(store, &mut self.actions, snapshot, &writes, self.mode, "action order"))
    }

    /// Pin each write to the version the row had when it was fetched.
    fn versioned(&self, writes: Vec<(String, ActionPatch)>, snapshot: &[Action]) -> Vec<(String, ActionPatch)> {
        writes
            .into_iter()
            .map(|(id, patch)| {
                let patch = match snapshot.iter().find(|a| a.id == id) {
                    Some(row) => patch.expecting(row.version),
                    None => patch,
                };
                (id, patch)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Field edits
    // -----------------------------------------------------------------------

    /// Commit one inline-edited field.
    pub fn edit<S: ActionStore + ?Sized>(
        &mut self,
        store: &S,
        id: &str,
        field: ActionField,
        value: &FieldValue,
    ) -> Result<WriteOutcome> {
        let patch = field.to_patch(value, self.max_priority)?;
        self.patch_row(store, id, patch)
    }

    pub fn set_status<S: ActionStore + ?Sized>(
        &mut self,
        store: &S,
        id: &str,
        status: ActionStatus,
    ) -> Result<WriteOutcome> {
        self.patch_row(store, id, ActionPatch::status(status))
    }

    /// Manual priority pick, limited to `1..=max_manual`.
    pub fn set_priority<S: ActionStore + ?Sized>(&mut self, store: &S, id: &str, level: u32) -> Result<WriteOutcome> {
        if level == 0 || level > self.max_priority {
            return Err(RhythmError::InvalidPriority {
                value: level as i64,
                reason: format!("pick a priority between 1 and {}", self.max_priority),
            });
        }
        self.patch_row(store, id, ActionPatch::priority(level))
    }

    /// Toggle a watcher. Adding requires an active member; removing always works.
    /// Returns whether the member is watching afterwards.
    pub fn toggle_watcher<S: ActionStore + ?Sized>(
        &mut self,
        store: &S,
        members: &[SupportMember],
        id: &str,
        member_id: &str,
    ) -> Result<(bool, WriteOutcome)> {
        let mut watchers = self.row(id)?.watchers.clone();
        let watching = watcher::toggle_watcher(&mut watchers, member_id);
        if watching {
            watcher::validate_watchers(&[member_id.to_string()], members)?;
        }
        let outcome = self.patch_row(store, id, ActionPatch::watchers(watchers))?;
        Ok((watching, outcome))
    }

    fn row(&self, id: &str) -> Result<&Action> {
        self.actions
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| RhythmError::ActionNotFound(id.to_string()))
    }

    fn patch_row<S: ActionStore + ?Sized>(&mut self, store: &S, id: &str, patch: ActionPatch) -> Result<WriteOutcome> {
        self.ensure_open()?;
        let version = self.row(id)?.version;
        let patch = patch.expecting(version);
        let snapshot = self.actions.clone();

        if let Some(row) = self.actions.iter_mut().find(|a| a.id == id) {
            row.apply(&patch)?;
        }
        if patch.priority_level.is_some() {
            sort_for_display(&mut self.actions);
        }
        let writes = vec![(id.to_string(), patch)];
        Ok(write_back(store, &mut self.actions, snapshot, &writes, self.mode, "action"))
    }
}

impl Drop for ActionViewer {
    fn drop(&mut self) {
        self.liveness.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
