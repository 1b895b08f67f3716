use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rhythm_core::circle::SupportMember;
use rhythm_core::types::MemberRole;

use crate::error::AppError;
use crate::routes::events::Change;
use crate::state::AppState;

#[derive(serde::Deserialize, Default)]
pub struct ListMembersQuery {
    #[serde(default)]
    pub active: bool,
}

/// GET /api/members: the support circle; `?active=true` hides deactivated members.
pub async fn list_members(
    State(app): State<AppState>,
    Query(query): Query<ListMembersQuery>,
) -> Result<Json<Vec<SupportMember>>, AppError> {
    let root = app.root.clone();
    let members = tokio::task::spawn_blocking(move || {
        if query.active {
            SupportMember::list_active(&root)
        } else {
            SupportMember::list(&root)
        }
    })
    .await
    .map_err(AppError::join)??;
    Ok(Json(members))
}

#[derive(serde::Deserialize)]
pub struct CreateMemberBody {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/members: add someone to the support circle.
pub async fn create_member(
    State(app): State<AppState>,
    Json(body): Json<CreateMemberBody>,
) -> Result<(StatusCode, Json<SupportMember>), AppError> {
    let role: MemberRole = body.role.parse()?;
    let root = app.root.clone();
    let member = tokio::task::spawn_blocking(move || {
        let mut member = SupportMember::new(body.name, role);
        if let Some(id) = body.id {
            member = member.with_id(id);
        }
        if let Some(email) = body.email {
            member = member.with_email(email);
        }
        SupportMember::create(&root, member)
    })
    .await
    .map_err(AppError::join)??;

    app.notify(Change::Members);
    Ok((StatusCode::CREATED, Json(member)))
}

/// POST /api/members/:id/deactivate
pub async fn deactivate_member(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SupportMember>, AppError> {
    let root = app.root.clone();
    let member = tokio::task::spawn_blocking(move || SupportMember::deactivate(&root, &id))
        .await
        .map_err(AppError::join)??;
    app.notify(Change::Members);
    Ok(Json(member))
}
