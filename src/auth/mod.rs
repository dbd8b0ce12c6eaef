//! # Jira OAuth 2.0 (3LO) Authentication Module
//!
//! Módulo isolado para autorizar o middleware na API do Jira Cloud.
//!
//! ## Responsabilidades:
//! - Emitir a URL de autorização com nonce de uso único
//! - Trocar authorization code por tokens
//! - Manter o access token válido (refresh single-flight)
//! - Persistir o TokenRecord entre restarts
//!
//! ## Estrutura:
//! - `config.rs`: Configurações OAuth2
//! - `client.rs`: Cliente HTTP do token endpoint
//! - `token.rs`: TokenRecord
//! - `token_store.rs`: Persistência (arquivo JSON / memória)
//! - `token_manager.rs`: Estado em memória + refresh
//! - `handshake.rs`: Máquina de estados do callback
//! - `handlers.rs`: Handlers HTTP (start, callback, revoke)

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod handshake;
pub mod token;
pub mod token_manager;
pub mod token_store;

pub use client::OAuthClient;
pub use config::OAuth2Config;
pub use error::{AuthError, AuthResult, StoreError};
pub use handlers::OAuth2State;
pub use handshake::{AuthorizationFlow, CallbackOutcome, HandshakeState};
pub use token::TokenRecord;
pub use token_manager::{TokenManager, TokenStatus};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
