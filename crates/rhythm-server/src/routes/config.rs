use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/config: the parsed `.rhythm/config.yaml` plus its validation warnings.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let root = app.root.clone();
    let result = tokio::task::spawn_blocking(move || {
        let config = rhythm_core::config::Config::load(&root)?;
        let warnings = config.validate();
        Ok::<_, rhythm_core::RhythmError>(serde_json::json!({
            "config": config,
            "warnings": warnings,
        }))
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_config_fails_when_not_initialized() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = AppState::new(dir.path().to_path_buf());
        assert!(get_config(State(app)).await.is_err());
    }

    #[tokio::test]
    async fn get_config_returns_project_config() {
        let dir = tempfile::TempDir::new().unwrap();
        rhythm_core::config::Config::new("my-rhythm")
            .save(dir.path())
            .unwrap();

        let app = AppState::new(dir.path().to_path_buf());
        let json = get_config(State(app)).await.unwrap().0;
        assert_eq!(json["config"]["project"]["name"], "my-rhythm");
        assert_eq!(json["config"]["persistence"]["mode"], "transactional");
        assert_eq!(json["warnings"].as_array().unwrap().len(), 0);
    }
}
