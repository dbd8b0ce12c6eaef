//! OAuth2 HTTP Client
//!
//! Cliente HTTP isolado para o token endpoint da Atlassian. Não guarda estado:
//! quem decide quando trocar ou renovar é o `TokenManager`.

use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::token::{TokenRecord, TokenResponse};
use super::{AuthError, AuthResult, OAuth2Config};
use crate::utils::logging::*;
use crate::utils::truncate_safe;

/// Qual grant está sendo executado; muda o mapeamento de erro
#[derive(Debug, Clone, Copy)]
enum Grant {
    AuthorizationCode,
    RefreshToken,
}

/// Cliente OAuth2 para Atlassian
pub struct OAuthClient {
    config: OAuth2Config,
    http_client: Client,
}

impl OAuthClient {
    /// Criar novo cliente OAuth2 (timeout vem da configuração)
    pub fn new(config: OAuth2Config) -> AuthResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AuthError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Trocar authorization code por TokenRecord
    ///
    /// `redirect_uri` precisa ser exatamente a usada na URL de autorização;
    /// divergência é rejeitada pelo provedor e volta como `Rejected`.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AuthResult<TokenRecord> {
        log_info(&format!(
            "🔐 [OAuth2] Trocando authorization code por access token (code: {}...)",
            truncate_safe(code, 6)
        ));

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let record = self.request_token(&params, Grant::AuthorizationCode).await?;

        if !record.can_refresh() {
            log_warning("⚠️ [OAuth2] Provedor não retornou refresh token (scope offline_access ausente?)");
        }

        log_info(&format!(
            "✅ [OAuth2] Access token obtido: {}... (expira em {})",
            truncate_safe(&record.access_token, 8),
            record.expires_at.to_rfc3339()
        ));

        Ok(record)
    }

    /// Renovar o access token usando o refresh token
    ///
    /// Campos não reenviados (refresh token rotativo, scope) ficam vazios;
    /// o chamador completa com `TokenRecord::inherit_missing`.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenRecord> {
        if refresh_token.is_empty() {
            return Err(AuthError::ReauthorizationRequired(
                "no refresh token available".to_string(),
            ));
        }

        log_info("🔄 [OAuth2] Renovando access token...");

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        self.request_token(&params, Grant::RefreshToken).await
    }

    async fn request_token(&self, params: &[(&str, &str)], grant: Grant) -> AuthResult<TokenRecord> {
        let issued_at = Utc::now();

        let response = self
            .http_client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(params)
            .send()
            .await
            .map_err(|e| {
                log_error(&format!("❌ [OAuth2] Falha ao conectar com token endpoint: {}", e));
                AuthError::Transient(format!("token endpoint unreachable: {}", e))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log_error(&format!("❌ [OAuth2] {:?} falhou: {} - {}", grant, status, error_text));
            return Err(classify_failure(status, &error_text, grant));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            log_error(&format!("❌ [OAuth2] Resposta do token endpoint ilegível: {}", e));
            AuthError::Transient(format!("unreadable token response: {}", e))
        })?;

        Ok(TokenRecord::from_response(body, issued_at))
    }
}

/// 5xx/408/429 são transitórios; o resto depende do grant
fn classify_failure(status: StatusCode, body: &str, grant: Grant) -> AuthError {
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return AuthError::Transient(format!("token endpoint returned {}", status));
    }

    let reason = provider_error_code(body).unwrap_or_else(|| status.to_string());

    match grant {
        Grant::RefreshToken => AuthError::ReauthorizationRequired(reason),
        Grant::AuthorizationCode => AuthError::Rejected(reason),
    }
}

/// Extrai `error` / `error_description` do corpo OAuth padrão
fn provider_error_code(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let code = json.get("error")?.as_str()?;
    match json.get("error_description").and_then(|d| d.as_str()) {
        Some(desc) => Some(format!("{}: {}", code, desc)),
        None => Some(code.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthSettings;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> OAuthClient {
        let config = OAuth2Config::from_settings(&OAuthSettings {
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            redirect_uri: "https://bot.example/auth/callback".to_string(),
            token_url: server.url("/oauth/token"),
            timeout_seconds: 2,
            ..OAuthSettings::default()
        })
        .unwrap();
        OAuthClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let server = MockServer::start_async().await;
        let token = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth/token")
                    .body_contains("grant_type=authorization_code")
                    .body_contains("code=auth-code")
                    .body_contains("redirect_uri=https%3A%2F%2Fbot.example%2Fauth%2Fcallback");
                then.status(200).json_body(json!({
                    "access_token": "at-1",
                    "refresh_token": "rt-1",
                    "expires_in": 3600,
                    "scope": "read:jira-work offline_access"
                }));
            })
            .await;

        let client = client_for(&server);
        let before = Utc::now();
        let record = client
            .exchange_code("auth-code", "https://bot.example/auth/callback")
            .await
            .unwrap();

        assert_eq!(record.access_token, "at-1");
        assert_eq!(record.refresh_token, "rt-1");
        assert!(record.expires_at >= before + chrono::Duration::seconds(3600));
        assert!(record.scope.contains("offline_access"));
        token.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/token");
                then.status(403).json_body(json!({
                    "error": "invalid_grant",
                    "error_description": "redirect_uri mismatch"
                }));
            })
            .await;

        let err = client_for(&server)
            .exchange_code("auth-code", "https://wrong.example/cb")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Rejected("invalid_grant: redirect_uri mismatch".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_invalid_grant_requires_reauthorization() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth/token")
                    .body_contains("grant_type=refresh_token")
                    .body_contains("refresh_token=rt-old");
                then.status(403).json_body(json!({ "error": "invalid_grant" }));
            })
            .await;

        let err = client_for(&server).refresh("rt-old").await.unwrap_err();
        assert!(matches!(err, AuthError::ReauthorizationRequired(_)));
    }

    #[tokio::test]
    async fn test_refresh_server_error_is_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/token");
                then.status(503).body("upstream unavailable");
            })
            .await;

        let err = client_for(&server).refresh("rt-old").await.unwrap_err();
        assert!(matches!(err, AuthError::Transient(_)));
    }

    #[tokio::test]
    async fn test_refresh_timeout_is_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/token");
                then.status(200)
                    .delay(Duration::from_secs(5))
                    .json_body(json!({ "access_token": "late", "expires_in": 3600 }));
            })
            .await;

        let err = client_for(&server).refresh("rt-old").await.unwrap_err();
        assert!(matches!(err, AuthError::Transient(_)));
    }

    #[tokio::test]
    async fn test_refresh_without_token_skips_provider() {
        let server = MockServer::start_async().await;
        let token = server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/token");
                then.status(200);
            })
            .await;

        let err = client_for(&server).refresh("").await.unwrap_err();
        assert!(matches!(err, AuthError::ReauthorizationRequired(_)));
        token.assert_hits_async(0).await;
    }
}
