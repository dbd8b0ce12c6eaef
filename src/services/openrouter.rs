//! Cliente de geração de texto (OpenRouter, API compatível com chat completions)

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmSettings;
use crate::utils::logging::*;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("text generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("text generation API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("text generation returned no content")]
    EmptyResponse,

    #[error("text generation is not configured")]
    NotConfigured,
}

/// Endpoint que completa um prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Verificação barata de conectividade e credencial (sem gerar texto)
    async fn health_check(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

/// Cliente para a API do OpenRouter
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterClient {
    /// `None` quando não há API key (classificação só por fallback)
    pub fn from_settings(settings: &LlmSettings) -> Result<Option<Self>, LlmError> {
        let Some(api_key) = settings.api_key.clone().filter(|k| !k.is_empty()) else {
            log_warning("⚠️ [OpenRouter] OPENROUTER_API_KEY ausente: classificação usará apenas o fallback");
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        log_info(&format!("OpenRouter client initialized (model: {})", settings.model));

        Ok(Some(Self {
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }))
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        let response = self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "Jira Ticket Middleware")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log_error(&format!("OpenRouter API error: {} - {}", status, error_text));
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let json_response: Value = response.json().await?;

        // Extrair resposta do modelo
        json_response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let url = format!("{}/models", self.base_url);

        let response = self.client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text.chars().take(200).collect(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> OpenRouterClient {
        OpenRouterClient::from_settings(&LlmSettings {
            api_key: Some("or-key".to_string()),
            base_url: server.base_url(),
            timeout_seconds: 1,
            ..LlmSettings::default()
        })
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_without_api_key_is_disabled() {
        assert!(OpenRouterClient::from_settings(&LlmSettings::default()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_extracts_content() {
        let server = MockServer::start_async().await;
        let completions = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer or-key")
                    .body_contains("\"role\":\"user\"");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "  {\"title\": \"x\"}  " } }]
                }));
            })
            .await;

        let content = client_for(&server).complete("prompt").await.unwrap();
        assert_eq!(content, "{\"title\": \"x\"}");
        completions.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_non_success_is_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let err = client_for(&server).complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let err = client_for(&server).complete("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_health_check_lists_models() {
        let server = MockServer::start_async().await;
        let models = server
            .mock_async(|when, then| {
                when.method(GET).path("/models").header("authorization", "Bearer or-key");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        client_for(&server).health_check().await.unwrap();
        models.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_health_check_bad_key() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/models");
                then.status(401).body("invalid key");
            })
            .await;

        let err = client_for(&server).health_check().await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 401, .. }));
    }
}
