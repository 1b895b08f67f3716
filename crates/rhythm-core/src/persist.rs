//! Write-back of in-memory action changes to a backing store.
//!
//! Two strategies are supported:
//!
//! - [`PersistMode::Sequential`] issues one `update` per changed row, in list
//!   order, and stops at the first failure. Rows written before the failure
//!   stay written, the in-memory list keeps its optimistic state, and the
//!   caller gets one generic failure notice.
//! - [`PersistMode::Transactional`] sends every row in one all-or-nothing
//!   `update_batch`. On failure the in-memory list is restored from the
//!   snapshot taken before the optimistic change and the notice names the row
//!   that failed.

use crate::action::{Action, ActionPatch};
use crate::error::{Result, RhythmError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Which slice of the action table a list shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    All,
    Recording(String),
}

impl Scope {
    pub fn contains(&self, action: &Action) -> bool {
        match self {
            Scope::All => true,
            Scope::Recording(id) => action.recording_id.as_deref() == Some(id.as_str()),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Recording(id) => write!(f, "recording:{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionStore
// ---------------------------------------------------------------------------

pub trait ActionStore: Send + Sync {
    /// Actions in `scope`, in display order.
    fn list(&self, scope: &Scope) -> Result<Vec<Action>>;

    fn load(&self, id: &str) -> Result<Action>;

    fn insert(&self, action: &Action) -> Result<()>;

    /// Apply `patch` to one row and return the stored result.
    fn update(&self, id: &str, patch: &ActionPatch) -> Result<Action>;

    /// Apply every patch or none of them.
    fn update_batch(&self, writes: &[(String, ActionPatch)]) -> Result<Vec<Action>>;
}

fn check_version(current: &Action, patch: &ActionPatch) -> Result<()> {
    match patch.expected_version {
        Some(expected) if expected != current.version => Err(RhythmError::VersionConflict {
            id: current.id.clone(),
            expected,
            found: current.version,
        }),
        _ => Ok(()),
    }
}

fn patched(mut action: Action, patch: &ActionPatch) -> Result<Action> {
    check_version(&action, patch)?;
    action.apply(patch)?;
    action.version += 1;
    Ok(action)
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// One YAML document per action under `.rhythm/actions/`.
///
/// Clones share one write lock, so the version check and the write of an
/// update happen as a single step for every handle in the process.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
    /// 1-based position in `update_batch` whose save is rejected.
    #[cfg(test)]
    fail_on_save: Option<usize>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
            #[cfg(test)]
            fail_on_save: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save_row(&self, position: usize, action: &Action) -> Result<()> {
        if let Some(e) = self.injected_fault(position) {
            return Err(e);
        }
        action.save(&self.root)
    }

    #[cfg(test)]
    fn injected_fault(&self, position: usize) -> Option<RhythmError> {
        (self.fail_on_save == Some(position))
            .then(|| RhythmError::Io(std::io::Error::other("disk full")))
    }

    #[cfg(not(test))]
    fn injected_fault(&self, _position: usize) -> Option<RhythmError> {
        None
    }
}

impl ActionStore for FileStore {
    fn list(&self, scope: &Scope) -> Result<Vec<Action>> {
        match scope {
            Scope::All => Action::list(&self.root),
            Scope::Recording(id) => Action::list_for_recording(&self.root, id),
        }
    }

    fn load(&self, id: &str) -> Result<Action> {
        Action::load(&self.root, id)
    }

    fn insert(&self, action: &Action) -> Result<()> {
        let _guard = self.lock();
        action.save(&self.root)
    }

    fn update(&self, id: &str, patch: &ActionPatch) -> Result<Action> {
        let _guard = self.lock();
        let action = patched(Action::load(&self.root, id)?, patch)?;
        action.save(&self.root)?;
        tracing::debug!(action = id, fields = ?patch.changed_fields(), "action updated");
        Ok(action)
    }

    fn update_batch(&self, writes: &[(String, ActionPatch)]) -> Result<Vec<Action>> {
        let _guard = self.lock();
        // Load and validate everything before the first write.
        let mut originals = Vec::with_capacity(writes.len());
        let mut updated = Vec::with_capacity(writes.len());
        for (id, patch) in writes {
            let current = Action::load(&self.root, id)?;
            updated.push(patched(current.clone(), patch)?);
            originals.push(current);
        }

        for (index, action) in updated.iter().enumerate() {
            if let Err(e) = self.save_row(index + 1, action) {
                tracing::warn!(action = %action.id, error = %e, "batch write failed, restoring");
                for original in &originals[..index] {
                    if let Err(restore) = original.save(&self.root) {
                        tracing::warn!(action = %original.id, error = %restore, "restore failed");
                    }
                }
                return Err(RhythmError::PersistFailed {
                    action_id: action.id.clone(),
                    index: index + 1,
                    total: writes.len(),
                    reason: e.to_string(),
                });
            }
        }
        tracing::info!(rows = updated.len(), "action batch committed");
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store. Can be told to reject the n-th row write, which makes it
/// the workhorse for exercising failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<String, Action>>,
    writes: AtomicUsize,
    fail_on: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.lock().unwrap_or_else(|e| e.into_inner());
            for a in actions {
                rows.insert(a.id.clone(), a);
            }
        }
        store
    }

    /// Reject the `n`-th row write (1-based) counted from now.
    pub fn fail_on_write(&self, n: usize) {
        self.writes.store(0, Ordering::SeqCst);
        *self.fail_on.lock().unwrap_or_else(|e| e.into_inner()) = Some(n);
    }

    /// Row writes attempted since creation or the last `fail_on_write`.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn next_write_fails(&self) -> bool {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        *self.fail_on.lock().unwrap_or_else(|e| e.into_inner()) == Some(n)
    }
}

impl ActionStore for MemoryStore {
    fn list(&self, scope: &Scope) -> Result<Vec<Action>> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let mut actions: Vec<Action> = rows.values().filter(|a| scope.contains(a)).cloned().collect();
        crate::action::sort_for_display(&mut actions);
        Ok(actions)
    }

    fn load(&self, id: &str) -> Result<Action> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.get(id)
            .cloned()
            .ok_or_else(|| RhythmError::ActionNotFound(id.to_string()))
    }

    fn insert(&self, action: &Action) -> Result<()> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.insert(action.id.clone(), action.clone());
        Ok(())
    }

    fn update(&self, id: &str, patch: &ActionPatch) -> Result<Action> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let current = rows
            .get(id)
            .cloned()
            .ok_or_else(|| RhythmError::ActionNotFound(id.to_string()))?;
        if self.next_write_fails() {
            return Err(RhythmError::Io(std::io::Error::other(format!(
                "write to {id} rejected"
            ))));
        }
        let action = patched(current, patch)?;
        rows.insert(id.to_string(), action.clone());
        Ok(action)
    }

    fn update_batch(&self, writes: &[(String, ActionPatch)]) -> Result<Vec<Action>> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let mut staged = Vec::with_capacity(writes.len());
        for (index, (id, patch)) in writes.iter().enumerate() {
            let current = rows
                .get(id)
                .cloned()
                .ok_or_else(|| RhythmError::ActionNotFound(id.to_string()))?;
            if self.next_write_fails() {
                return Err(RhythmError::PersistFailed {
                    action_id: id.clone(),
                    index: index + 1,
                    total: writes.len(),
                    reason: "write rejected".to_string(),
                });
            }
            staged.push(patched(current, patch)?);
        }
        for action in &staged {
            rows.insert(action.id.clone(), action.clone());
        }
        Ok(staged)
    }
}

// ---------------------------------------------------------------------------
// PersistMode / Notice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    Sequential,
    #[default]
    Transactional,
}

impl std::str::FromStr for PersistMode {
    type Err = RhythmError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sequential" => Ok(PersistMode::Sequential),
            "transactional" => Ok(PersistMode::Transactional),
            _ => Err(RhythmError::InvalidField {
                field: "persistence.mode".to_string(),
                reason: format!("unknown mode '{s}' (valid: sequential, transactional)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Failure,
}

/// The one user-facing message produced by a write-back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Failure,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

/// What happened to one write-back.
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    pub notice: Notice,
    /// Rows the store accepted.
    pub written: usize,
    pub rolled_back: bool,
    /// The underlying error, kept for logs and API callers; never shown in
    /// the sequential notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Write-back
// ---------------------------------------------------------------------------

/// Persist `writes` after `list` has already been changed optimistically.
///
/// `snapshot` is the list as it was before the optimistic change; it is only
/// used by transactional mode to undo a failed write. `subject` names what was
/// updated in the notice ("action order", "action").
pub fn write_back<S: ActionStore + ?Sized>(
    store: &S,
    list: &mut Vec<Action>,
    snapshot: Vec<Action>,
    writes: &[(String, ActionPatch)],
    mode: PersistMode,
    subject: &str,
) -> WriteOutcome {
    if writes.is_empty() {
        return WriteOutcome {
            notice: Notice::success(format!("No changes to {subject}")),
            written: 0,
            rolled_back: false,
            error: None,
        };
    }
    match mode {
        PersistMode::Sequential => sequential(store, list, writes, subject),
        PersistMode::Transactional => transactional(store, list, snapshot, writes, subject),
    }
}

fn sequential<S: ActionStore + ?Sized>(
    store: &S,
    list: &mut [Action],
    writes: &[(String, ActionPatch)],
    subject: &str,
) -> WriteOutcome {
    let mut written = 0;
    for (id, patch) in writes {
        match store.update(id, patch) {
            Ok(stored) => {
                refresh_version(list, &stored);
                written += 1;
            }
            Err(e) => {
                tracing::warn!(action = %id, written, total = writes.len(), error = %e, "write failed");
                return WriteOutcome {
                    notice: Notice::failure(format!("Failed to update {subject}")),
                    written,
                    rolled_back: false,
                    error: Some(e.to_string()),
                };
            }
        }
    }
    WriteOutcome {
        notice: Notice::success(format!("Updated {subject}")),
        written,
        rolled_back: false,
        error: None,
    }
}

fn transactional<S: ActionStore + ?Sized>(
    store: &S,
    list: &mut Vec<Action>,
    snapshot: Vec<Action>,
    writes: &[(String, ActionPatch)],
    subject: &str,
) -> WriteOutcome {
    match store.update_batch(writes) {
        Ok(stored) => {
            for row in &stored {
                refresh_version(list, row);
            }
            WriteOutcome {
                notice: Notice::success(format!("Updated {subject}")),
                written: stored.len(),
                rolled_back: false,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(rows = writes.len(), error = %e, "batch failed, restoring previous list");
            *list = snapshot;
            WriteOutcome {
                notice: Notice::failure(format!("Failed to update {subject}: {e}")),
                written: 0,
                rolled_back: true,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Copy the store's version and timestamp onto the matching in-memory row.
fn refresh_version(list: &mut [Action], stored: &Action) {
    if let Some(row) = list.iter_mut().find(|a| a.id == stored.id) {
        row.version = stored.version;
        row.updated_at = stored.updated_at;
    }
}

/// The per-row priority writes for a renumber.
pub fn priority_writes(changes: &[crate::order::PriorityChange]) -> Vec<(String, ActionPatch)> {
    changes
        .iter()
        .map(|c| (c.action_id.clone(), ActionPatch::priority(c.to)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn five() -> Vec<Action> {
        (1..=5).map(|p| Action::new(format!("item {p}"), p)).collect()
    }

    #[test]
    fn file_store_update_bumps_version() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let action = Action::new("Drink water", 1);
        store.insert(&action).unwrap();

        let stored = store.update(&action.id, &ActionPatch::priority(3)).unwrap();
        assert_eq!(stored.priority_level, 3);
        assert_eq!(stored.version, 1);
        assert_eq!(store.load(&action.id).unwrap().priority_level, 3);
    }

    #[test]
    fn stale_expected_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let action = Action::new("Drink water", 1);
        store.insert(&action).unwrap();
        store.update(&action.id, &ActionPatch::priority(2)).unwrap();

        let err = store
            .update(&action.id, &ActionPatch::priority(4).expecting(0))
            .unwrap_err();
        assert!(matches!(
            err,
            RhythmError::VersionConflict {
                expected: 0,
                found: 1,
                ..
            }
        ));
        assert_eq!(store.load(&action.id).unwrap().priority_level, 2);
    }

    #[test]
    fn file_store_batch_validates_before_writing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let a = Action::new("a", 1);
        store.insert(&a).unwrap();

        let writes = vec![
            (a.id.clone(), ActionPatch::priority(2)),
            ("ghost".to_string(), ActionPatch::priority(1)),
        ];
        assert!(matches!(
            store.update_batch(&writes),
            Err(RhythmError::ActionNotFound(_))
        ));
        assert_eq!(store.load(&a.id).unwrap().priority_level, 1);
    }

    #[test]
    fn file_store_batch_restores_rows_written_before_failure() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path());
        let rows = five();
        for action in &rows {
            store.insert(action).unwrap();
        }
        store.fail_on_save = Some(3);

        let writes: Vec<(String, ActionPatch)> = rows
            .iter()
            .map(|a| (a.id.clone(), ActionPatch::priority(6 - a.priority_level).expecting(0)))
            .collect();
        let err = store.update_batch(&writes).unwrap_err();
        match err {
            RhythmError::PersistFailed { action_id, index, total, .. } => {
                assert_eq!(action_id, rows[2].id);
                assert_eq!(index, 3);
                assert_eq!(total, 5);
            }
            other => panic!("unexpected error: {other}"),
        }

        for original in &rows {
            let stored = store.load(&original.id).unwrap();
            assert_eq!(stored.priority_level, original.priority_level);
            assert_eq!(stored.version, 0);
        }
    }

    #[test]
    fn concurrent_writers_at_same_version_conflict() {
        for _ in 0..20 {
            let dir = TempDir::new().unwrap();
            let store = Arc::new(FileStore::new(dir.path()));
            let action = Action::new("Drink water", 1);
            store.insert(&action).unwrap();
            let barrier = Arc::new(std::sync::Barrier::new(2));

            let handles: Vec<_> = [2, 3]
                .into_iter()
                .map(|level| {
                    let store = Arc::clone(&store);
                    let barrier = Arc::clone(&barrier);
                    let id = action.id.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        store.update(&id, &ActionPatch::priority(level).expecting(0))
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(results
                .iter()
                .any(|r| matches!(r, Err(RhythmError::VersionConflict { expected: 0, found: 1, .. }))));
            assert_eq!(store.load(&action.id).unwrap().version, 1);
        }
    }

    #[test]
    fn file_store_scope_filters_by_recording() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        store.insert(&Action::new("a", 1).with_recording("r1")).unwrap();
        store.insert(&Action::new("b", 1)).unwrap();
        assert_eq!(store.list(&Scope::All).unwrap().len(), 2);
        assert_eq!(store.list(&Scope::Recording("r1".into())).unwrap().len(), 1);
    }

    #[test]
    fn memory_batch_is_all_or_nothing() {
        let store = MemoryStore::with_actions(five());
        let rows = store.list(&Scope::All).unwrap();
        store.fail_on_write(2);
        let writes: Vec<(String, ActionPatch)> = rows
            .iter()
            .map(|a| (a.id.clone(), ActionPatch::priority(9)))
            .collect();
        let err = store.update_batch(&writes).unwrap_err();
        assert!(matches!(err, RhythmError::PersistFailed { index: 2, total: 5, .. }));
        assert!(store
            .list(&Scope::All)
            .unwrap()
            .iter()
            .all(|a| a.priority_level != 9));
    }

    #[test]
    fn sequential_failure_keeps_optimistic_list() {
        let store = MemoryStore::with_actions(five());
        let mut list = store.list(&Scope::All).unwrap();
        let snapshot = list.clone();
        list.reverse();
        let changes = crate::order::renumber(&mut list);
        let optimistic: Vec<String> = list.iter().map(|a| a.id.clone()).collect();

        store.fail_on_write(1);
        let outcome = write_back(
            &store,
            &mut list,
            snapshot,
            &priority_writes(&changes),
            PersistMode::Sequential,
            "action order",
        );
        assert_eq!(outcome.notice, Notice::failure("Failed to update action order"));
        assert_eq!(outcome.written, 0);
        assert!(!outcome.rolled_back);
        let after: Vec<String> = list.iter().map(|a| a.id.clone()).collect();
        assert_eq!(after, optimistic);
    }

    #[test]
    fn empty_write_back_is_success() {
        let store = MemoryStore::new();
        let mut list = Vec::new();
        let outcome = write_back(&store, &mut list, Vec::new(), &[], PersistMode::Transactional, "action");
        assert!(outcome.notice.is_success());
        assert_eq!(store.write_count(), 0);
    }
}
