// crates/core/src/llm/serving_endpoint.rs
//! Translator backed by an OpenAI-compatible model-serving endpoint.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;

use super::config::LlmConfig;
use super::prompt::{build_system_prompt, build_user_prompt, clean_sql};
use super::provider::Translator;
use super::types::{
    ChatMessage, ChatRequest, ChatResponseRaw, Translation, TranslationMetrics, TranslationRequest,
};
use crate::error::TranslationError;
use crate::pricing::{calculate_llm_cost, TokenUsage};

/// Calls `{host}/serving-endpoints/chat/completions` for each object.
#[derive(Clone)]
pub struct ServingEndpointTranslator {
    http_client: Client,
    config: LlmConfig,
}

impl ServingEndpointTranslator {
    pub fn new(config: LlmConfig) -> Result<Self, TranslationError> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TranslationError::NotConfigured(e.to_string()))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl Translator for ServingEndpointTranslator {
    async fn translate(&self, request: TranslationRequest) -> Result<Translation, TranslationError> {
        let Some(token) = self.config.token.as_deref() else {
            return Err(TranslationError::NotConfigured(
                "DATABRICKS_HOST and DATABRICKS_TOKEN must be set".to_string(),
            ));
        };
        if self.config.host.is_empty() {
            return Err(TranslationError::NotConfigured(
                "DATABRICKS_HOST is not set".to_string(),
            ));
        }

        let start = Instant::now();
        let body = ChatRequest {
            model: request.model_id.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: build_system_prompt(&request),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_user_prompt(&request),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.config.base_url()))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, model = %request.model_id, "Serving endpoint request failed");
                TranslationError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, model = %request.model_id, "Serving endpoint error");
            return Err(TranslationError::Api {
                status: status.as_u16(),
                message: message.chars().take(500).collect(),
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| TranslationError::ParseFailed(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let translated_sql = clean_sql(&content);
        if translated_sql.is_empty() {
            return Err(TranslationError::EmptyResponse);
        }

        let usage = raw.usage.unwrap_or_default();
        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            model = %request.model_id,
            latency_ms,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Translation completed"
        );

        Ok(Translation {
            translated_sql,
            metrics: TranslationMetrics {
                usage: TokenUsage {
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                    total_tokens: usage.total_tokens,
                    estimated_cost_usd: calculate_llm_cost(
                        &request.model_id,
                        usage.prompt_tokens,
                        usage.completion_tokens,
                    ),
                },
                model_used: request.model_id,
                latency_ms,
            },
        })
    }

    fn name(&self) -> &str {
        "serving-endpoint"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SourceDialect;

    fn request() -> TranslationRequest {
        TranslationRequest {
            source_sql: "SELECT NVL(a, 0) FROM t".to_string(),
            source_dialect: SourceDialect::Oracle,
            model_id: "databricks-claude-sonnet-4-5".to_string(),
            target_catalog: "main".to_string(),
            target_schema: "sales".to_string(),
        }
    }

    fn translator(host: String) -> ServingEndpointTranslator {
        ServingEndpointTranslator::new(LlmConfig {
            host,
            token: Some("dapi-test".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_translate_success_strips_fences_and_prices_usage() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/serving-endpoints/chat/completions")
            .match_header("authorization", "Bearer dapi-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{"message": {"role": "assistant", "content": "```sql\nSELECT COALESCE(a, 0) FROM t\n```"}}],
                    "usage": {"prompt_tokens": 1000000, "completion_tokens": 1000000, "total_tokens": 2000000}
                }"#,
            )
            .create_async()
            .await;

        let translation = translator(server.url()).translate(request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(translation.translated_sql, "SELECT COALESCE(a, 0) FROM t");
        assert_eq!(translation.metrics.model_used, "databricks-claude-sonnet-4-5");
        assert_eq!(translation.metrics.usage.total_tokens, 2_000_000);
        assert!((translation.metrics.usage.estimated_cost_usd - 18.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_translate_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/serving-endpoints/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = translator(server.url()).translate(request()).await.unwrap_err();
        match err {
            TranslationError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_translate_empty_answer() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/serving-endpoints/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"content": "```sql\n```"}}]}"#)
            .create_async()
            .await;

        let err = translator(server.url()).translate(request()).await.unwrap_err();
        assert!(matches!(err, TranslationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_translate_without_token_is_not_configured() {
        let translator = ServingEndpointTranslator::new(LlmConfig {
            host: "https://example.com".to_string(),
            token: None,
            ..Default::default()
        })
        .unwrap();
        let err = translator.translate(request()).await.unwrap_err();
        assert!(matches!(err, TranslationError::NotConfigured(_)));
    }
}
