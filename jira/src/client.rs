//! Cliente HTTP para a API REST do Jira Cloud (OAuth 2.0)

use crate::error::{JiraError, Result};
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Gateway padrão para chamadas com tokens OAuth 2.0 (3LO)
pub const DEFAULT_API_GATEWAY: &str = "https://api.atlassian.com";

/// Recurso (site) acessível pelo token
#[derive(Debug, Clone, Deserialize)]
pub struct AccessibleResource {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub name: String,
}

/// Resposta de `GET /rest/api/3/serverInfo` (usada no health check)
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Cliente para interagir com a API do Jira
///
/// Com OAuth 2.0 as chamadas não vão direto para `https://<site>.atlassian.net`,
/// e sim para `{gateway}/ex/jira/{cloud_id}/rest/api/3`. O cloud id é resolvido
/// uma única vez e fica em cache.
///
/// O access token é passado em cada chamada: quem gerencia o ciclo de vida
/// do token é o chamador.
#[derive(Clone)]
pub struct JiraClient {
    http_client: HttpClient,
    site_url: String,
    api_gateway_url: String,
    cloud_id: Arc<RwLock<Option<String>>>,
}

impl JiraClient {
    /// Cria um novo cliente Jira
    ///
    /// # Argumentos
    ///
    /// * `site_url` - URL do site (ex: `https://acme.atlassian.net`), usada para browse URLs
    /// * `api_gateway_url` - Gateway OAuth (normalmente [`DEFAULT_API_GATEWAY`])
    /// * `timeout_secs` - Timeout total por requisição
    pub fn new(
        site_url: impl Into<String>,
        api_gateway_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| JiraError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            api_gateway_url: api_gateway_url.into().trim_end_matches('/').to_string(),
            cloud_id: Arc::new(RwLock::new(None)),
        })
    }

    /// Fixa o cloud id (dispensa a consulta a accessible-resources)
    pub fn with_cloud_id(self, cloud_id: impl Into<String>) -> Self {
        Self {
            cloud_id: Arc::new(RwLock::new(Some(cloud_id.into()))),
            ..self
        }
    }

    /// URL base da API v3 para o site configurado
    pub async fn api_base(&self, access_token: &str) -> Result<String> {
        let cloud_id = self.cloud_id(access_token).await?;
        Ok(format!("{}/ex/jira/{}/rest/api/3", self.api_gateway_url, cloud_id))
    }

    /// URL de navegação de uma issue
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.site_url, key)
    }

    /// Obtém o site URL
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    async fn cloud_id(&self, access_token: &str) -> Result<String> {
        if let Some(id) = self.cloud_id.read().await.as_ref() {
            return Ok(id.clone());
        }

        let resources = self.accessible_resources(access_token).await?;

        let resource = resources
            .iter()
            .find(|r| r.url.trim_end_matches('/') == self.site_url)
            .or_else(|| {
                if !resources.is_empty() {
                    tracing::warn!(
                        "Site {} not among accessible resources, using first available",
                        self.site_url
                    );
                }
                resources.first()
            })
            .ok_or_else(|| JiraError::NotFound("no accessible Jira site for this token".to_string()))?;

        tracing::info!("Resolved Jira cloud id {} ({})", resource.id, resource.url);

        *self.cloud_id.write().await = Some(resource.id.clone());
        Ok(resource.id.clone())
    }

    /// Lista os sites acessíveis pelo token
    pub async fn accessible_resources(&self, access_token: &str) -> Result<Vec<AccessibleResource>> {
        let url = format!("{}/oauth/token/accessible-resources", self.api_gateway_url);

        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        parse_json(response).await
    }

    /// Versão e tipo de deploy do site; valida token e conectividade
    pub async fn server_info(&self, access_token: &str) -> Result<ServerInfo> {
        self.get_json(access_token, "/serverInfo").await
    }

    /// Executa um GET na API v3 e parseia JSON
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, access_token: &str, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.api_base(access_token).await?, endpoint);

        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        parse_json(response).await
    }

    /// Executa um POST na API v3 e parseia JSON
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        endpoint: &str,
        body: &Value,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base(access_token).await?, endpoint);

        tracing::debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        parse_json(response).await
    }

    /// Processa a resposta HTTP e trata erros
    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!("Jira API error ({}): {}", status_code, error_body);

        let message = extract_error_message(&error_body);

        if status_code == 401 {
            return Err(JiraError::Unauthorized(message));
        }

        Err(JiraError::ApiError {
            status: status_code,
            message,
        })
    }
}

/// Lê o corpo inteiro e desserializa; corpo fora do formato vira `JsonError`
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Unexpected Jira response body: {}", body.chars().take(200).collect::<String>());
        JiraError::from(e)
    })
}

/// Extrai a mensagem de erro do corpo `{errorMessages: [], errors: {campo: msg}}`
fn extract_error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    let mut parts: Vec<String> = json
        .get("errorMessages")
        .and_then(|v| v.as_array())
        .map(|msgs| msgs.iter().filter_map(|m| m.as_str().map(String::from)).collect())
        .unwrap_or_default();

    if let Some(errors) = json.get("errors").and_then(|v| v.as_object()) {
        for (field, msg) in errors {
            parts.push(format!("{}: {}", field, msg.as_str().unwrap_or_default()));
        }
    }

    if parts.is_empty() {
        json.get("message")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| body.to_string())
    } else {
        parts.join("; ")
    }
}
