//! Token Manager
//!
//! Dono único do TokenRecord em memória. Decide quando renovar e garante no
//! máximo um refresh em andamento: chamadores concorrentes aguardam o mesmo
//! future compartilhado e recebem o mesmo resultado (sucesso ou falha).
//!
//! Reusar um refresh token já trocado costuma invalidá-lo no provedor, então
//! o single-flight é requisito de corretude.

use chrono::{DateTime, Duration, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::token::TokenRecord;
use super::token_store::TokenStore;
use super::{AuthError, AuthResult, OAuthClient};
use crate::utils::logging::*;

type SharedRefresh = Shared<BoxFuture<'static, AuthResult<TokenRecord>>>;

/// Refresh em andamento; `id` evita que um refresh antigo libere o slot de outro
struct PendingRefresh {
    id: u64,
    future: SharedRefresh,
}

/// O que motivou o pedido de refresh
enum RefreshTrigger {
    /// Token dentro da margem de expiração
    Expiring,
    /// Provedor recusou este access token (401)
    Rejected(String),
}

/// Snapshot para /ready e /status (sem segredos)
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub authenticated: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Vec<String>,
    pub can_refresh: bool,
    pub refresh_in_flight: bool,
    pub refresh_count: u64,
}

struct Inner {
    oauth: Arc<OAuthClient>,
    store: Arc<dyn TokenStore>,
    record: RwLock<Option<TokenRecord>>,
    in_flight: Mutex<Option<PendingRefresh>>,
    refresh_margin: Duration,
    refresh_count: AtomicU64,
    /// Incrementada por install/deauthorize; resultado de refresh de outra geração é descartado
    generation: AtomicU64,
    next_refresh_id: AtomicU64,
}

/// Gerenciador de tokens OAuth2 (barato de clonar)
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl TokenManager {
    pub fn new(oauth: Arc<OAuthClient>, store: Arc<dyn TokenStore>, refresh_margin_seconds: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                oauth,
                store,
                record: RwLock::new(None),
                in_flight: Mutex::new(None),
                refresh_margin: Duration::seconds(refresh_margin_seconds as i64),
                refresh_count: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                next_refresh_id: AtomicU64::new(0),
            }),
        }
    }

    /// Obter access token válido (memória → TokenStore → refresh se necessário)
    ///
    /// # Erros
    /// - `Unauthenticated`: handshake nunca concluído
    /// - `ReauthorizationRequired`: refresh token recusado (estado limpo)
    /// - `Transient`: falha de rede no refresh (estado mantido)
    pub async fn get_valid_access_token(&self) -> AuthResult<String> {
        let current = self.current_record().await?.ok_or(AuthError::Unauthenticated)?;

        if !current.needs_refresh(Utc::now(), self.inner.refresh_margin) {
            return Ok(current.access_token);
        }

        log_info(&format!(
            "⏰ [TokenManager] Token expira em {}, refresh necessário",
            current.expires_at.to_rfc3339()
        ));

        let refreshed = self.refresh(RefreshTrigger::Expiring).await?;
        Ok(refreshed.access_token)
    }

    /// Renovar após o provedor recusar `rejected_token`
    ///
    /// Se outro chamador já trocou o token, devolve o atual sem nova chamada.
    pub async fn refresh_rejected(&self, rejected_token: &str) -> AuthResult<String> {
        log_warning("⚠️ [TokenManager] Access token recusado pelo Jira, forçando refresh");

        let refreshed = self
            .refresh(RefreshTrigger::Rejected(rejected_token.to_string()))
            .await?;
        Ok(refreshed.access_token)
    }

    /// Instalar o registro obtido no handshake
    ///
    /// A memória é atualizada mesmo se a persistência falhar; nesse caso o
    /// erro `Storage` é devolvido para ser exibido ao operador. Um refresh em
    /// andamento não sobrescreve o registro instalado.
    pub async fn install(&self, record: TokenRecord) -> AuthResult<()> {
        let save_result = {
            let mut slot = self.inner.record.write().await;
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            let save_result = self.inner.store.save(&record).await;
            *slot = Some(record);
            save_result
        };

        save_result.map_err(|e| {
            log_error(&format!("❌ [TokenManager] Falha ao persistir token: {}", e));
            AuthError::from(e)
        })?;

        log_info("✅ [TokenManager] Token instalado e persistido");
        Ok(())
    }

    /// Esquecer o token (memória e TokenStore)
    ///
    /// Um refresh em andamento termina sem gravar nada.
    pub async fn deauthorize(&self) -> AuthResult<()> {
        {
            let mut slot = self.inner.record.write().await;
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            *slot = None;
            self.inner.store.clear().await?;
        }
        log_info("🗑️ [TokenManager] Autorização removida");
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(self.current_record().await, Ok(Some(_)))
    }

    pub async fn status(&self) -> TokenStatus {
        let record = self.current_record().await.ok().flatten();
        let refresh_in_flight = self.inner.in_flight.lock().await.is_some();

        TokenStatus {
            authenticated: record.is_some(),
            expires_at: record.as_ref().map(|r| r.expires_at),
            scope: record
                .as_ref()
                .map(|r| r.scope.iter().cloned().collect())
                .unwrap_or_default(),
            can_refresh: record.as_ref().map_or(false, TokenRecord::can_refresh),
            refresh_in_flight,
            refresh_count: self.inner.refresh_count.load(Ordering::Relaxed),
        }
    }

    /// Refresh proativo periódico, para que um serviço ocioso não perca o refresh token
    pub fn spawn_background_refresh(&self, interval: std::time::Duration) -> JoinHandle<()> {
        let manager = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if !manager.is_authenticated().await {
                    continue;
                }

                if let Err(e) = manager.get_valid_access_token().await {
                    log_warning(&format!("⚠️ [TokenManager] Refresh em background falhou: {}", e));
                }
            }
        })
    }

    async fn current_record(&self) -> AuthResult<Option<TokenRecord>> {
        if let Some(record) = self.inner.record.read().await.as_ref() {
            return Ok(Some(record.clone()));
        }

        let generation = self.inner.generation.load(Ordering::SeqCst);
        let loaded = self.inner.store.load().await?;

        let mut slot = self.inner.record.write().await;
        // install/deauthorize durante a leitura vencem o que veio do disco
        if slot.is_none() && self.inner.generation.load(Ordering::SeqCst) == generation {
            if loaded.is_some() {
                log_info("📂 [TokenManager] Token carregado do TokenStore");
            }
            *slot = loaded;
        }
        Ok(slot.clone())
    }

    async fn refresh(&self, trigger: RefreshTrigger) -> AuthResult<TokenRecord> {
        let pending = {
            let mut in_flight = self.inner.in_flight.lock().await;

            match in_flight.as_ref() {
                Some(pending) => {
                    log_info("⏳ [TokenManager] Refresh já em andamento, aguardando resultado");
                    pending.future.clone()
                }
                None => {
                    let generation = self.inner.generation.load(Ordering::SeqCst);

                    // Um refresh pode ter terminado entre a checagem do chamador e este lock
                    let current = self.current_record().await?.ok_or(AuthError::Unauthenticated)?;

                    let still_needed = match &trigger {
                        RefreshTrigger::Expiring => {
                            current.needs_refresh(Utc::now(), self.inner.refresh_margin)
                        }
                        RefreshTrigger::Rejected(token) => current.access_token == *token,
                    };

                    if !still_needed {
                        return Ok(current);
                    }

                    let id = self.inner.next_refresh_id.fetch_add(1, Ordering::Relaxed);
                    let inner = self.inner.clone();
                    let future = async move { inner.run_refresh(id, generation, current).await }
                        .boxed()
                        .shared();
                    *in_flight = Some(PendingRefresh {
                        id,
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        pending.await
    }
}

impl Inner {
    /// Executa o refresh; memória e TokenStore são atualizados antes de liberar os que aguardam
    async fn run_refresh(self: Arc<Self>, id: u64, generation: u64, stale: TokenRecord) -> AuthResult<TokenRecord> {
        let result = self
            .oauth
            .refresh(&stale.refresh_token)
            .await
            .map(|fresh| fresh.inherit_missing(&stale));

        let outcome = {
            let mut slot = self.record.write().await;

            if self.generation.load(Ordering::SeqCst) != generation {
                log_warning("⚠️ [TokenManager] Autorização trocada durante o refresh, resultado descartado");
                slot.clone().ok_or(AuthError::Unauthenticated)
            } else {
                match result {
                    Ok(record) => {
                        if let Err(e) = self.store.save(&record).await {
                            // Token novo continua válido em memória; próximo refresh tenta persistir de novo
                            log_error(&format!("❌ [TokenManager] Falha ao persistir token renovado: {}", e));
                        }
                        *slot = Some(record.clone());
                        self.refresh_count.fetch_add(1, Ordering::Relaxed);
                        log_token_refreshed(&record.expires_at.to_rfc3339());
                        Ok(record)
                    }
                    Err(AuthError::ReauthorizationRequired(reason)) => {
                        log_error(&format!(
                            "🚨 [TokenManager] Refresh token recusado ({}). Reautorização necessária em /auth/jira",
                            reason
                        ));
                        self.generation.fetch_add(1, Ordering::SeqCst);
                        *slot = None;
                        if let Err(e) = self.store.clear().await {
                            log_error(&format!("❌ [TokenManager] Falha ao limpar TokenStore: {}", e));
                        }
                        Err(AuthError::ReauthorizationRequired(reason))
                    }
                    Err(e) => {
                        log_warning(&format!("⚠️ [TokenManager] Refresh falhou, estado mantido: {}", e));
                        Err(e)
                    }
                }
            }
        };

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().map_or(false, |pending| pending.id == id) {
            *in_flight = None;
        }

        outcome
    }
}
