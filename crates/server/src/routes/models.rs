//! Serving-endpoint model catalog.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use dw_migrate_core::pricing::{ModelInfo, AVAILABLE_MODELS, DEFAULT_MODEL_ID};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub default_model: &'static str,
    pub models: &'static [ModelInfo],
}

/// GET /api/models - Models usable for translation, with per-million-token prices.
pub async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        default_model: DEFAULT_MODEL_ID,
        models: AVAILABLE_MODELS,
    })
}

/// Create the models routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/models", get(list_models))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_models_endpoint_lists_catalog() {
        let app = crate::create_app(crate::test_support::test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["default_model"], "databricks-llama-4-maverick");
        let models = json["models"].as_array().expect("models should be an array");
        assert_eq!(models.len(), 7);
        assert!(models.iter().any(|m| m["id"] == "databricks-claude-sonnet-4-5"));
        assert!(models[0]["pricing"]["input"].is_number());
    }
}
