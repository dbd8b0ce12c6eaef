//! OAuth2 Configuration
//!
//! Centraliza as configurações do OAuth 2.0 (3LO) da Atlassian

use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::config::OAuthSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// Client ID do app no developer console da Atlassian
    pub client_id: String,

    /// Client Secret do app
    #[serde(skip_serializing)]
    pub client_secret: String,

    /// URL de callback registrada no app (precisa bater exatamente)
    pub redirect_uri: String,

    pub authorize_url: String,
    pub token_url: String,
    pub audience: String,

    /// Deve incluir `offline_access`, senão não há refresh token
    pub scopes: Vec<String>,

    pub timeout_seconds: u64,
}

impl OAuth2Config {
    /// Criar configuração a partir da seção `oauth` das settings
    pub fn from_settings(settings: &OAuthSettings) -> Result<Self, AuthError> {
        if settings.client_id.is_empty() {
            return Err(AuthError::Config("JIRA_CLIENT_ID não configurado".to_string()));
        }
        if settings.client_secret.is_empty() {
            return Err(AuthError::Config("JIRA_CLIENT_SECRET não configurado".to_string()));
        }

        if !settings.scopes.iter().any(|s| s == "offline_access") {
            tracing::warn!("⚠️ [OAuth2] Scope offline_access ausente: o token não poderá ser renovado");
        }

        Ok(Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            authorize_url: settings.authorize_url.clone(),
            token_url: settings.token_url.clone(),
            audience: settings.audience.clone(),
            scopes: settings.scopes.clone(),
            timeout_seconds: settings.timeout_seconds,
        })
    }

    /// Gerar URL de autorização da Atlassian para um `state` já emitido
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&audience={}&prompt=consent&state={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scopes.join(" ")),
            urlencoding::encode(&self.audience),
            urlencoding::encode(state)
        )
    }
}
