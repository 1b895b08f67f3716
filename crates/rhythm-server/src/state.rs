use crate::routes::events::Change;
use rhythm_core::cache::ActionCache;
use rhythm_core::persist::FileStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub store: Arc<FileStore>,
    /// One copy of the action rows for every handler.
    pub cache: Arc<ActionCache>,
    pub event_tx: broadcast::Sender<Change>,
}

impl AppState {
    pub fn new(root: PathBuf) -> Self {
        let (tx, _) = broadcast::channel(64);
        let state = Self {
            store: Arc::new(FileStore::new(root.clone())),
            cache: Arc::new(ActionCache::new()),
            root,
            event_tx: tx,
        };

        // Rows written by the CLI while the server runs change the actions
        // directory's mtime; drop the cache and tell subscribers when it moves.
        // Only spawned inside a Tokio runtime (skipped in sync unit tests).
        if tokio::runtime::Handle::try_current().is_ok() {
            let actions_dir = rhythm_core::paths::actions_dir(&state.root);
            let cache = state.cache.clone();
            let tx = state.event_tx.clone();
            tokio::spawn(async move {
                let mut last_mtime = None::<std::time::SystemTime>;
                loop {
                    tokio::time::sleep(std::time::Duration::from_millis(800)).await;
                    let Ok(meta) = tokio::fs::metadata(&actions_dir).await else {
                        continue;
                    };
                    let Ok(mtime) = meta.modified() else {
                        continue;
                    };
                    if last_mtime.is_some_and(|last| last != mtime) {
                        cache.invalidate_all();
                        let _ = tx.send(Change::Actions);
                    }
                    last_mtime = Some(mtime);
                }
            });
        }

        state
    }

    /// Tell SSE subscribers that something changed.
    pub fn notify(&self, change: Change) {
        let _ = self.event_tx.send(change);
    }
}
