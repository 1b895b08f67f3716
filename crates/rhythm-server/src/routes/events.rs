use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

/// What a change-feed event is about. Clients refetch only the matching list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Actions,
    Recordings,
    Members,
    Notes,
    /// The subscriber fell behind and missed events; refetch everything.
    Resync,
}

impl Change {
    pub fn as_str(self) -> &'static str {
        match self {
            Change::Actions => "actions",
            Change::Recordings => "recordings",
            Change::Members => "members",
            Change::Notes => "notes",
            Change::Resync => "resync",
        }
    }
}

fn change_of(msg: Result<Change, BroadcastStreamRecvError>) -> Change {
    match msg {
        Ok(change) => change,
        Err(e) => {
            tracing::debug!(error = %e, "change feed subscriber lagged");
            Change::Resync
        }
    }
}

/// GET /api/events: SSE stream with one `update` event per store change; the
/// data field names what changed.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let stream = BroadcastStream::new(app.event_tx.subscribe()).map(|msg| {
        let change = change_of(msg);
        Ok::<Event, Infallible>(Event::default().event("update").data(change.as_str()))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast;

    #[tokio::test]
    async fn lagging_subscriber_is_told_to_resync() {
        let (tx, rx) = broadcast::channel(1);
        let mut changes = BroadcastStream::new(rx).map(change_of);
        tx.send(Change::Notes).unwrap();
        tx.send(Change::Actions).unwrap();

        assert_eq!(changes.next().await, Some(Change::Resync));
        assert_eq!(changes.next().await, Some(Change::Actions));
    }

    #[tokio::test]
    async fn notify_reaches_subscribers_in_order() {
        let state = AppState::new(std::path::PathBuf::from("/tmp/rhythm-events"));
        let mut changes = BroadcastStream::new(state.event_tx.subscribe()).map(change_of);
        state.notify(Change::Recordings);
        state.notify(Change::Actions);

        assert_eq!(changes.next().await, Some(Change::Recordings));
        assert_eq!(changes.next().await, Some(Change::Actions));
    }
}
