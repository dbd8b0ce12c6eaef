//! Tipos de erro para o crate jira

use thiserror::Error;

/// Erros do cliente Jira
#[derive(Debug, Error)]
pub enum JiraError {
    /// Erro de requisição HTTP (conexão, timeout)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro da API do Jira (status code não-2xx, exceto 401)
    #[error("Jira API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Access token rejeitado (401)
    #[error("Access token rejected: {0}")]
    Unauthorized(String),

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Recurso não encontrado (site, projeto)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl JiraError {
    /// Falhas de transporte que podem ser tentadas de novo pelo chamador
    pub fn is_transient(&self) -> bool {
        match self {
            JiraError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            JiraError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, JiraError>;
