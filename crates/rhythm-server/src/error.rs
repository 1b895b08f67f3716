use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rhythm_core::error::RhythmError;

/// Carries an explicit 400 through the `anyhow::Error` chain for request
/// problems that have no `RhythmError` counterpart.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    pub fn join(e: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {e}"))
    }
}

pub fn status_for(e: &RhythmError) -> StatusCode {
    match e {
        RhythmError::NotInitialized => StatusCode::BAD_REQUEST,
        RhythmError::ActionNotFound(_)
        | RhythmError::MemberNotFound(_)
        | RhythmError::RecordingNotFound(_) => StatusCode::NOT_FOUND,
        RhythmError::MemberExists(_)
        | RhythmError::RecordingExists(_)
        | RhythmError::VersionConflict { .. } => StatusCode::CONFLICT,
        RhythmError::InvalidId(_)
        | RhythmError::InvalidPriority { .. }
        | RhythmError::InvalidStatus(_)
        | RhythmError::InvalidConfidence(_)
        | RhythmError::InvalidMove { .. }
        | RhythmError::InvalidOrder(_)
        | RhythmError::InvalidField { .. } => StatusCode::BAD_REQUEST,
        RhythmError::MemberInactive(_) | RhythmError::PersistFailed { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RhythmError::Io(_) | RhythmError::Yaml(_) | RhythmError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.downcast_ref::<BadRequestError>().is_some() {
            StatusCode::BAD_REQUEST
        } else if let Some(e) = self.0.downcast_ref::<RhythmError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
