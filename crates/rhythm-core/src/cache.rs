use crate::action::{sort_for_display, Action};
use crate::error::Result;
use crate::persist::{ActionStore, Scope};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct CacheInner {
    rows: HashMap<String, Action>,
    scopes: HashMap<Scope, Vec<String>>,
    generation: u64,
}

/// One shared copy of action rows, keyed by id, for every reader in a process.
///
/// The first read of a scope loads it from the store while holding the lock, so
/// concurrent readers of the same scope wait for that single load instead of
/// issuing their own. Writers push the stored row back with [`ActionCache::put`].
#[derive(Debug, Default)]
pub struct ActionCache {
    inner: Mutex<CacheInner>,
}

impl ActionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions in `scope`, in display order.
    pub fn scope<S: ActionStore + ?Sized>(&self, store: &S, scope: &Scope) -> Result<Vec<Action>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.scopes.contains_key(scope) {
            tracing::debug!(%scope, "action cache miss");
            let loaded = store.list(scope)?;
            let ids = loaded.iter().map(|a| a.id.clone()).collect();
            for action in loaded {
                inner.rows.insert(action.id.clone(), action);
            }
            inner.scopes.insert(scope.clone(), ids);
        }
        let mut actions: Vec<Action> = inner.scopes[scope]
            .iter()
            .filter_map(|id| inner.rows.get(id).cloned())
            .collect();
        sort_for_display(&mut actions);
        Ok(actions)
    }

    pub fn get(&self, id: &str) -> Option<Action> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.rows.get(id).cloned()
    }

    /// Record a row as stored. Cached scopes that should contain it pick it up.
    pub fn put(&self, action: &Action) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::put_locked(&mut inner, action);
        inner.generation += 1;
    }

    pub fn put_all(&self, actions: &[Action]) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for action in actions {
            Self::put_locked(&mut inner, action);
        }
        inner.generation += 1;
    }

    fn put_locked(inner: &mut CacheInner, action: &Action) {
        for (scope, ids) in inner.scopes.iter_mut() {
            let member = scope.contains(action);
            let listed = ids.iter().any(|id| *id == action.id);
            if member && !listed {
                ids.push(action.id.clone());
            } else if !member && listed {
                ids.retain(|id| *id != action.id);
            }
        }
        inner.rows.insert(action.id.clone(), action.clone());
    }

    pub fn invalidate(&self, scope: &Scope) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.scopes.remove(scope);
        inner.generation += 1;
    }

    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.scopes.clear();
        inner.rows.clear();
        inner.generation += 1;
    }

    /// Bumped on every change; a reader holding an older value has stale data.
    pub fn generation(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).generation
    }
}
