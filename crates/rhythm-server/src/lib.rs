pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(root: PathBuf) -> Router {
    let app_state = state::AppState::new(root);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Config / display tables
        .route("/api/config", get(routes::config::get_config))
        .route("/api/statuses", get(routes::statuses::get_statuses))
        // Support circle
        .route(
            "/api/members",
            get(routes::members::list_members).post(routes::members::create_member),
        )
        .route(
            "/api/members/{id}/deactivate",
            post(routes::members::deactivate_member),
        )
        // Recordings
        .route(
            "/api/recordings",
            get(routes::recordings::list_recordings).post(routes::recordings::create_recording),
        )
        .route("/api/recordings/{id}", get(routes::recordings::get_recording))
        .route(
            "/api/recordings/{id}/actions",
            get(routes::recordings::list_recording_actions),
        )
        .route(
            "/api/recordings/{id}/actions/import",
            post(routes::recordings::import_recording_actions),
        )
        .route(
            "/api/recordings/{id}/actions/order",
            put(routes::recordings::reorder_recording_actions),
        )
        // Actions
        .route(
            "/api/actions",
            get(routes::actions::list_actions).post(routes::actions::create_action),
        )
        .route(
            "/api/actions/{id}",
            get(routes::actions::get_action).patch(routes::actions::patch_action),
        )
        .route(
            "/api/actions/{id}/watchers",
            get(routes::watchers::list_watchers),
        )
        .route(
            "/api/actions/{id}/watchers/{member_id}",
            post(routes::watchers::toggle_watcher),
        )
        .route(
            "/api/actions/{id}/notes",
            get(routes::notes::list_notes).post(routes::notes::add_note),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `port`.
pub async fn serve(root: PathBuf, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(root, listener, open_browser).await
}

/// Start the API server on a pre-bound listener, so the caller can read the
/// actual port first (useful when `port = 0` and the OS picks one).
pub async fn serve_on(
    root: PathBuf,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root);

    tracing::info!("rhythm server listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}/api/actions");
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    axum::serve(listener, app).await?;
    Ok(())
}
