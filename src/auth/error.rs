//! Erros do fluxo OAuth2
//!
//! `AuthError` é `Clone` porque o resultado de um refresh é compartilhado por
//! todos os chamadores que esperaram por ele.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Nenhum token foi emitido ainda (handshake nunca concluído)
    #[error("Jira is not authorized yet: complete the OAuth handshake at /auth/jira")]
    Unauthenticated,

    /// Refresh token rejeitado de forma permanente
    #[error("Jira re-authorization required: {0}")]
    ReauthorizationRequired(String),

    /// Falha de rede/timeout/5xx; estado preservado, pode tentar de novo
    #[error("Transient OAuth failure: {0}")]
    Transient(String),

    /// Callback com state desconhecido, reutilizado ou expirado
    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// Provedor recusou o authorization code
    #[error("Authorization code rejected by provider: {0}")]
    Rejected(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("OAuth configuration error: {0}")]
    Config(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Erros de persistência do TokenRecord
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token store format error: {0}")]
    Format(#[from] serde_json::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Storage(err.to_string())
    }
}
