//! Handshake de autorização (3LO)
//!
//! `Unauthenticated → AwaitingCallback → Authenticated`
//!
//! Cada URL de autorização emitida carrega um `state` (nonce) novo. O callback
//! consome o nonce exatamente uma vez; nonce divergente, reutilizado ou
//! expirado falha com `InvalidCallback`. Depois de `Authenticated` os
//! refreshes ficam inteiramente com o `TokenManager`.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AuthError, AuthResult, OAuthClient, TokenManager};
use crate::utils::logging::*;
use crate::utils::{constant_time_eq, truncate_safe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Unauthenticated,
    AwaitingCallback { nonce: String, issued_at: DateTime<Utc> },
    /// Nonce já consumido, troca do code em andamento
    Exchanging,
    Authenticated,
}

impl HandshakeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandshakeState::Unauthenticated => "unauthenticated",
            HandshakeState::AwaitingCallback { .. } => "awaiting_callback",
            HandshakeState::Exchanging => "exchanging",
            HandshakeState::Authenticated => "authenticated",
        }
    }
}

/// Resultado de um callback bem-sucedido (sem tokens)
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub expires_at: DateTime<Utc>,
    pub scope: Vec<String>,
    pub can_refresh: bool,
    /// Falso se o TokenStore falhou; o token vale só até o próximo restart
    pub persisted: bool,
}

pub struct AuthorizationFlow {
    oauth: Arc<OAuthClient>,
    token_manager: TokenManager,
    state: Mutex<HandshakeState>,
    state_ttl: Duration,
}

impl AuthorizationFlow {
    pub fn new(oauth: Arc<OAuthClient>, token_manager: TokenManager, state_ttl_seconds: u64) -> Self {
        Self {
            oauth,
            token_manager,
            state: Mutex::new(HandshakeState::Unauthenticated),
            state_ttl: Duration::seconds(state_ttl_seconds as i64),
        }
    }

    pub async fn state(&self) -> HandshakeState {
        self.state.lock().await.clone()
    }

    /// Emitir URL de autorização com nonce novo (invalida o anterior)
    pub async fn authorization_url(&self) -> String {
        let nonce = Uuid::new_v4().simple().to_string();

        *self.state.lock().await = HandshakeState::AwaitingCallback {
            nonce: nonce.clone(),
            issued_at: Utc::now(),
        };

        log_info(&format!(
            "🚀 [OAuth2] Nova URL de autorização emitida (state: {}...)",
            truncate_safe(&nonce, 6)
        ));

        self.oauth.config().authorization_url(&nonce)
    }

    /// Processar `GET /auth/callback?code&state`
    pub async fn complete(&self, code: &str, state: &str) -> AuthResult<CallbackOutcome> {
        self.consume_nonce(state).await?;

        let redirect_uri = self.oauth.config().redirect_uri.clone();

        let record = match self.oauth.exchange_code(code, &redirect_uri).await {
            Ok(record) => record,
            Err(e) => {
                log_error(&format!("❌ [OAuth2] Troca do code falhou: {}", e));
                *self.state.lock().await = HandshakeState::Unauthenticated;
                return Err(e);
            }
        };

        let outcome = CallbackOutcome {
            expires_at: record.expires_at,
            scope: record.scope.iter().cloned().collect(),
            can_refresh: record.can_refresh(),
            persisted: true,
        };

        let persisted = match self.token_manager.install(record).await {
            Ok(()) => true,
            Err(AuthError::Storage(_)) => false,
            Err(e) => {
                *self.state.lock().await = HandshakeState::Unauthenticated;
                return Err(e);
            }
        };

        *self.state.lock().await = HandshakeState::Authenticated;
        log_info("✅ [OAuth2] Handshake concluído");

        Ok(CallbackOutcome { persisted, ..outcome })
    }

    /// Provedor devolveu `error=` (ex: usuário negou acesso); consome o nonce se bater
    pub async fn abort(&self, state: Option<&str>, reason: &str) {
        let mut current = self.state.lock().await;
        if let HandshakeState::AwaitingCallback { nonce, .. } = &*current {
            if state.map_or(false, |state| constant_time_eq(nonce, state)) {
                log_warning(&format!("⚠️ [OAuth2] Autorização negada/abortada: {}", reason));
                *current = HandshakeState::Unauthenticated;
            }
        }
    }

    async fn consume_nonce(&self, state: &str) -> AuthResult<()> {
        let mut current = self.state.lock().await;

        match &*current {
            HandshakeState::AwaitingCallback { nonce, issued_at } => {
                if !constant_time_eq(nonce, state) {
                    log_warning("⚠️ [OAuth2] Callback com state divergente");
                    return Err(AuthError::InvalidCallback(
                        "state does not match the pending authorization request".to_string(),
                    ));
                }

                if Utc::now() >= *issued_at + self.state_ttl {
                    log_warning("⚠️ [OAuth2] Callback com state expirado");
                    *current = HandshakeState::Unauthenticated;
                    return Err(AuthError::InvalidCallback(
                        "authorization request expired, start again".to_string(),
                    ));
                }

                *current = HandshakeState::Exchanging;
                Ok(())
            }
            other => {
                log_warning(&format!(
                    "⚠️ [OAuth2] Callback sem autorização pendente (estado: {})",
                    other.as_str()
                ));
                Err(AuthError::InvalidCallback(
                    "no pending authorization request for this state (already used?)".to_string(),
                ))
            }
        }
    }
}
