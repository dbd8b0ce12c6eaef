//! Health check das dependências externas (Jira e gerador de texto)
//!
//! As verificações rodam em paralelo e o relatório fica em cache por
//! `server.health_cache_seconds`, para que monitores frequentes não virem
//! tráfego contra as APIs.

use jira::{JiraClient, JiraError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::openrouter::TextGenerator;
use crate::auth::{AuthError, TokenManager};
use crate::utils::logging::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    Healthy,
    /// Sem token ou token recusado: resolve com /auth/jira
    AuthenticationRequired,
    Unhealthy,
    NotConfigured,
}

impl DependencyStatus {
    /// Estados que não derrubam o status geral
    fn is_acceptable(self) -> bool {
        !matches!(self, DependencyStatus::Unhealthy)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyHealth {
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<jira::ServerInfo>,
}

impl DependencyHealth {
    fn new(status: DependencyStatus) -> Self {
        Self {
            status,
            response_time_ms: None,
            error: None,
            server_info: None,
        }
    }

    fn failed(status: DependencyStatus, error: impl ToString, started: Instant) -> Self {
        Self {
            error: Some(error.to_string()),
            response_time_ms: Some(started.elapsed().as_millis() as u64),
            ..Self::new(status)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall_status: &'static str,
    pub timestamp: String,
    pub total_check_time_ms: u64,
    pub cached: bool,
    pub services: BTreeMap<&'static str, DependencyHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.overall_status == "healthy"
    }
}

pub struct HealthChecker {
    token_manager: TokenManager,
    jira: JiraClient,
    generator: Option<Arc<dyn TextGenerator>>,
    cache_ttl: Duration,
    last_report: Mutex<Option<(Instant, HealthReport)>>,
}

impl HealthChecker {
    pub fn new(
        token_manager: TokenManager,
        jira: JiraClient,
        generator: Option<Arc<dyn TextGenerator>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            token_manager,
            jira,
            generator,
            cache_ttl,
            last_report: Mutex::new(None),
        }
    }

    /// Relatório em cache se ainda válido, senão verifica tudo de novo
    ///
    /// O lock fica retido durante a verificação: chamadas simultâneas esperam
    /// e reaproveitam o mesmo relatório.
    pub async fn check(&self) -> HealthReport {
        let mut last_report = self.last_report.lock().await;

        if let Some((checked_at, report)) = last_report.as_ref() {
            if checked_at.elapsed() < self.cache_ttl {
                return HealthReport {
                    cached: true,
                    ..report.clone()
                };
            }
        }

        let report = self.run_checks().await;
        *last_report = Some((Instant::now(), report.clone()));
        report
    }

    async fn run_checks(&self) -> HealthReport {
        let started = Instant::now();
        let timestamp = chrono::Utc::now().to_rfc3339();

        let (jira, text_generator) = tokio::join!(self.check_jira(), self.check_text_generator());

        let services = BTreeMap::from([("jira", jira), ("text_generator", text_generator)]);
        let healthy = services.values().all(|s| s.status.is_acceptable());

        if !healthy {
            log_warning(&format!(
                "⚠️ [Health] Dependência indisponível: {}",
                services
                    .iter()
                    .filter(|(_, s)| !s.status.is_acceptable())
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        HealthReport {
            overall_status: if healthy { "healthy" } else { "unhealthy" },
            timestamp,
            total_check_time_ms: started.elapsed().as_millis() as u64,
            cached: false,
            services,
        }
    }

    async fn check_jira(&self) -> DependencyHealth {
        let started = Instant::now();

        let token = match self.token_manager.get_valid_access_token().await {
            Ok(token) => token,
            Err(e @ (AuthError::Unauthenticated | AuthError::ReauthorizationRequired(_))) => {
                return DependencyHealth::failed(DependencyStatus::AuthenticationRequired, e, started);
            }
            Err(e) => return DependencyHealth::failed(DependencyStatus::Unhealthy, e, started),
        };

        match self.jira.server_info(&token).await {
            Ok(info) => DependencyHealth {
                response_time_ms: Some(started.elapsed().as_millis() as u64),
                server_info: Some(info),
                ..DependencyHealth::new(DependencyStatus::Healthy)
            },
            Err(JiraError::Unauthorized(_)) => DependencyHealth::failed(
                DependencyStatus::AuthenticationRequired,
                "Authentication required or token expired",
                started,
            ),
            Err(e) => DependencyHealth::failed(DependencyStatus::Unhealthy, e, started),
        }
    }

    async fn check_text_generator(&self) -> DependencyHealth {
        let Some(generator) = self.generator.as_ref() else {
            return DependencyHealth::new(DependencyStatus::NotConfigured);
        };

        let started = Instant::now();
        match generator.health_check().await {
            Ok(()) => DependencyHealth {
                response_time_ms: Some(started.elapsed().as_millis() as u64),
                ..DependencyHealth::new(DependencyStatus::Healthy)
            },
            Err(e) => DependencyHealth::failed(DependencyStatus::Unhealthy, e, started),
        }
    }
}
