use axum::http::StatusCode;
use http_body_util::BodyExt;
use rhythm_core::action::ActionPatch;
use rhythm_core::persist::{ActionStore, FileStore};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bootstrap a minimal `.rhythm/` store inside the given temp directory.
fn init_project(dir: &TempDir) {
    for d in rhythm_core::paths::all_dirs(dir.path()) {
        rhythm_core::io::ensure_dir(&d).unwrap();
    }
    rhythm_core::config::Config::new("test-project")
        .save(dir.path())
        .unwrap();
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

async fn post_json(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

async fn put_json(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    send(app, "PUT", uri, Some(body)).await
}

async fn patch_json(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    send(app, "PATCH", uri, Some(body)).await
}

/// A recording with five imported actions, "item 1" .. "item 5".
async fn recording_with_five(app: &axum::Router) {
    let (status, _) = post_json(
        app.clone(),
        "/api/recordings",
        json!({ "id": "weekly-checkin", "title": "Weekly check-in" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let actions: Vec<serde_json::Value> = (1..=5)
        .map(|i| json!({ "text": format!("item {i}"), "confidence": 0.9 }))
        .collect();
    let (status, body) = post_json(
        app.clone(),
        "/api/recordings/weekly-checkin/actions/import",
        json!({ "actions": actions }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.as_array().unwrap().len(), 5);
}

fn texts(actions: &serde_json::Value) -> Vec<String> {
    actions
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["text"].as_str().unwrap().to_string())
        .collect()
}

fn priorities(actions: &serde_json::Value) -> Vec<u64> {
    actions
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["priority_level"].as_u64().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Reordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn drag_last_to_first_persists_dense_priorities() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (status, body) = put_json(
        app.clone(),
        "/api/recordings/weekly-checkin/actions/order",
        json!({ "source": 4, "destination": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notice"]["level"], "success");
    assert_eq!(body["written"], 5);
    assert_eq!(
        texts(&body["actions"]),
        vec!["item 5", "item 1", "item 2", "item 3", "item 4"]
    );

    // A fresh router has an empty cache, so this reads from disk.
    let fresh = rhythm_server::build_router(dir.path().to_path_buf());
    let (_, listed) = get(fresh, "/api/recordings/weekly-checkin/actions").await;
    assert_eq!(texts(&listed)[0], "item 5");
    assert_eq!(priorities(&listed), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn failed_reorder_returns_422_with_previous_order() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (_, listed) = get(app.clone(), "/api/recordings/weekly-checkin/actions").await;
    let first = listed[0]["id"].as_str().unwrap().to_string();

    // Another writer edits a row behind the server's cache.
    let patch = ActionPatch {
        motivation: Some(Some("feel steadier".to_string())),
        ..ActionPatch::default()
    };
    FileStore::new(dir.path()).update(&first, &patch).unwrap();

    let (status, body) = put_json(
        app.clone(),
        "/api/recordings/weekly-checkin/actions/order",
        json!({ "source": 4, "destination": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["notice"]["level"], "failure");
    assert_eq!(body["rolled_back"], true);
    assert_eq!(body["written"], 0);
    assert!(body["error"].as_str().unwrap().contains("changed elsewhere"));
    assert_eq!(
        texts(&body["actions"]),
        vec!["item 1", "item 2", "item 3", "item 4", "item 5"]
    );

    // The cache was dropped, so the next read sees the other writer's edit.
    let (_, listed) = get(app, "/api/recordings/weekly-checkin/actions").await;
    assert_eq!(listed[0]["motivation"], "feel steadier");
    assert_eq!(listed[0]["version"], 1);
    assert_eq!(priorities(&listed), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn drop_without_destination_is_noop() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (status, body) = put_json(
        app.clone(),
        "/api/recordings/weekly-checkin/actions/order",
        json!({ "source": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["written"], 0);
    assert_eq!(texts(&body["actions"])[2], "item 3");
}

#[tokio::test]
async fn full_order_replaces_sequence() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (_, listed) = get(app.clone(), "/api/recordings/weekly-checkin/actions").await;
    let mut ids: Vec<String> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect();
    ids.reverse();

    let (status, body) = put_json(
        app.clone(),
        "/api/recordings/weekly-checkin/actions/order",
        json!({ "order": ids }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(texts(&body["actions"])[0], "item 5");
    assert_eq!(priorities(&body["actions"]), vec![1, 2, 3, 4, 5]);

    let (status, _) = put_json(
        app,
        "/api/recordings/weekly-checkin/actions/order",
        json!({ "order": [ids[0].clone()] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_drag_is_bad_request() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (status, body) = put_json(
        app.clone(),
        "/api/recordings/weekly-checkin/actions/order",
        json!({ "source": 0, "destination": 9 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid move"));

    let (status, _) = put_json(app, "/api/recordings/weekly-checkin/actions/order", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reorder_unknown_recording_is_404() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    let (status, _) = put_json(
        app,
        "/api/recordings/nope/actions/order",
        json!({ "source": 0, "destination": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manual_action_goes_to_end_of_list() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (status, body) = post_json(
        app.clone(),
        "/api/actions",
        json!({
            "text": "Book follow-up",
            "recording_id": "weekly-checkin",
            "status": "in_progress",
            "target_date": "2026-11-02"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["priority_level"], 6);
    assert_eq!(body["status"], "doing");
    assert_eq!(body["status_display"]["label"], "Doing");

    let (_, listed) = get(app, "/api/recordings/weekly-checkin/actions").await;
    assert_eq!(listed.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn patch_updates_cached_list_and_rejects_stale_version() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (_, listed) = get(app.clone(), "/api/actions").await;
    let id = listed[0]["id"].as_str().unwrap().to_string();

    let (status, body) = patch_json(
        app.clone(),
        &format!("/api/actions/{id}"),
        json!({ "status": "done", "expected_version": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 1);

    let (_, listed) = get(app.clone(), "/api/actions").await;
    assert_eq!(listed[0]["status"], "done");

    let (status, body) = patch_json(
        app.clone(),
        &format!("/api/actions/{id}"),
        json!({ "text": "stale edit", "expected_version": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("changed elsewhere"));

    let (status, _) = patch_json(app, &format!("/api/actions/{id}"), json!({ "priority_level": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_with_unknown_status_is_bad_request() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (_, listed) = get(app.clone(), "/api/actions").await;
    let id = listed[0]["id"].as_str().unwrap().to_string();

    let (status, body) = patch_json(
        app.clone(),
        &format!("/api/actions/{id}"),
        json!({ "status": "whatever" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("whatever"));

    let (_, stored) = get(app, &format!("/api/actions/{id}")).await;
    assert_eq!(stored["status"], "not_started");
    assert_eq!(stored["version"], 0);
}

#[tokio::test]
async fn unknown_action_is_404() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    let (status, body) = get(app, "/api/actions/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

// ---------------------------------------------------------------------------
// Support circle: watchers and notes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn watcher_toggle_round_trip() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    let (status, _) = post_json(
        app.clone(),
        "/api/members",
        json!({ "id": "sam", "name": "Sam", "role": "family" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = get(app.clone(), "/api/actions").await;
    let id = listed[0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/actions/{id}/watchers/sam");

    let (status, body) = post_json(app.clone(), &uri, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["watching"], true);

    let (_, watching) = get(app.clone(), &format!("/api/actions/{id}/watchers")).await;
    assert_eq!(watching[0]["name"], "Sam");

    let (_, body) = post_json(app.clone(), &uri, json!({})).await;
    assert_eq!(body["watching"], false);
    assert_eq!(body["watchers"].as_array().unwrap().len(), 0);

    let (status, _) = post_json(app, &format!("/api/actions/{id}/watchers/ghost"), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inactive_member_cannot_watch_or_comment() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;

    post_json(
        app.clone(),
        "/api/members",
        json!({ "id": "pat", "name": "Pat", "role": "friend" }),
    )
    .await;
    let (status, _) = post_json(app.clone(), "/api/members/pat/deactivate", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = get(app.clone(), "/api/actions").await;
    let id = listed[0]["id"].as_str().unwrap().to_string();

    let (status, _) = post_json(app.clone(), &format!("/api/actions/{id}/watchers/pat"), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post_json(
        app.clone(),
        &format!("/api/actions/{id}/notes"),
        json!({ "member_id": "pat", "body": "hello" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, active) = get(app, "/api/members?active=true").await;
    assert_eq!(active.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn hidden_notes_need_all_flag() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;
    post_json(
        app.clone(),
        "/api/members",
        json!({ "id": "lee", "name": "Dr. Lee", "role": "medical" }),
    )
    .await;

    let (_, listed) = get(app.clone(), "/api/actions").await;
    let id = listed[0]["id"].as_str().unwrap().to_string();
    let notes_uri = format!("/api/actions/{id}/notes");

    let (status, _) = post_json(
        app.clone(),
        &notes_uri,
        json!({ "member_id": "lee", "note_type": "encouragement", "body": "Keep going" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    post_json(
        app.clone(),
        &notes_uri,
        json!({ "member_id": "lee", "note_type": "concern", "body": "Check BP", "visible_to_user": false }),
    )
    .await;

    let (_, visible) = get(app.clone(), &notes_uri).await;
    assert_eq!(visible.as_array().unwrap().len(), 1);
    let (_, all) = get(app.clone(), &format!("{notes_uri}?all=true")).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, _) = post_json(
        app,
        &notes_uri,
        json!({ "member_id": "lee", "note_type": "rant", "body": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Display tables and config
// ---------------------------------------------------------------------------

#[tokio::test]
async fn statuses_lists_catalog_and_fallback() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    let (status, body) = get(app, "/api/statuses").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statuses"].as_array().unwrap().len(), 5);
    assert_eq!(body["fallback"]["label"], "Unknown");
    assert_eq!(body["priorities"][0]["label"], "Urgent");
    assert_eq!(body["priorities"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn config_requires_init() {
    let dir = TempDir::new().unwrap();
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    let (status, body) = get(app, "/api/config").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("rhythm init"));
}

#[tokio::test]
async fn duplicate_recording_is_conflict() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let app = rhythm_server::build_router(dir.path().to_path_buf());
    recording_with_five(&app).await;
    let (status, _) = post_json(
        app.clone(),
        "/api/recordings",
        json!({ "id": "weekly-checkin", "title": "again" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = get(app, "/api/recordings/weekly-checkin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["action_count"], 5);
    assert_eq!(body["recording"]["processed"], true);
}
