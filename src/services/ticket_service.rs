// ============================================================================
// Ticket Service - Mensagem com #ticket → issue no Jira
// ============================================================================
//
// Fluxo:
// 1. MessageProcessor valida e extrai o conteúdo
// 2. TicketClassifier preenche os campos (modelo ou fallback)
// 3. TokenManager fornece um access token válido
// 4. IssueCreator cria a issue
//
// Um 401 do Jira com token ainda "válido" força um refresh (single-flight) e
// UMA nova tentativa. Qualquer outra falha de criação volta sem retry.

use jira::{CreatedIssue, IssueCreator, JiraError, NewIssue};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::message_processor::MessageProcessor;
use super::ticket_classifier::TicketClassifier;
use crate::auth::TokenManager;
use crate::models::{ClassificationSource, InboundMessage, TicketReply};
use crate::utils::logging::*;
use crate::utils::{truncate_with_suffix, AppResult};

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    ignored: AtomicU64,
    created: AtomicU64,
    failed: AtomicU64,
    fallback_classifications: AtomicU64,
}

/// Contadores expostos em /status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TicketStats {
    pub messages_received: u64,
    pub messages_ignored: u64,
    pub tickets_created: u64,
    pub failures: u64,
    pub fallback_classifications: u64,
}

#[derive(Clone)]
pub struct TicketService {
    processor: MessageProcessor,
    classifier: TicketClassifier,
    token_manager: TokenManager,
    issue_creator: IssueCreator,
    default_reporter: Option<String>,
    counters: Arc<Counters>,
}

impl TicketService {
    pub fn new(
        processor: MessageProcessor,
        classifier: TicketClassifier,
        token_manager: TokenManager,
        issue_creator: IssueCreator,
        default_reporter: Option<String>,
    ) -> Self {
        Self {
            processor,
            classifier,
            token_manager,
            issue_creator,
            default_reporter: default_reporter.filter(|r| !r.trim().is_empty()),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn processor(&self) -> &MessageProcessor {
        &self.processor
    }

    pub fn classifier(&self) -> &TicketClassifier {
        &self.classifier
    }

    /// Processa uma mensagem; nunca falha
    pub async fn handle(&self, message: InboundMessage) -> TicketReply {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        if !self.processor.contains_marker(&message.text) {
            self.counters.ignored.fetch_add(1, Ordering::Relaxed);
            return TicketReply::Ignored;
        }

        log_info(&format!(
            "🎫 [TicketService] Mensagem com marcador: {}",
            truncate_with_suffix(&message.text, 80, "...")
        ));

        match self.process(&message).await {
            Ok(reply) => {
                self.counters.created.fetch_add(1, Ordering::Relaxed);
                reply
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                let category = err.category();
                log_ticket_failed(category.as_str(), &err.to_string());
                TicketReply::Failed {
                    category,
                    notice: err.user_notice(),
                }
            }
        }
    }

    pub fn stats(&self) -> TicketStats {
        TicketStats {
            messages_received: self.counters.received.load(Ordering::Relaxed),
            messages_ignored: self.counters.ignored.load(Ordering::Relaxed),
            tickets_created: self.counters.created.load(Ordering::Relaxed),
            failures: self.counters.failed.load(Ordering::Relaxed),
            fallback_classifications: self.counters.fallback_classifications.load(Ordering::Relaxed),
        }
    }

    async fn process(&self, message: &InboundMessage) -> AppResult<TicketReply> {
        let content = self.processor.validate(&message.text)?;

        let user_context = message
            .sender
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("Username: {}", s));

        let (ticket, source) = self
            .classifier
            .classify_with_context(&content, user_context.as_deref())
            .await;
        if source == ClassificationSource::Fallback {
            self.counters.fallback_classifications.fetch_add(1, Ordering::Relaxed);
        }

        let reporter = message
            .reporter_account_id
            .clone()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.default_reporter.clone());

        let created = self.create_with_auth_retry(&ticket.to_new_issue(reporter)).await?;

        log_ticket_created(&created.key, ticket.title());

        Ok(TicketReply::Created {
            key: created.key,
            url: created.url,
            title: ticket.title().to_string(),
            issue_type: ticket.issue_type().to_string(),
            priority: ticket.priority().to_string(),
            source,
        })
    }

    async fn create_with_auth_retry(&self, issue: &NewIssue) -> AppResult<CreatedIssue> {
        let token = self.token_manager.get_valid_access_token().await?;

        match self.issue_creator.create(issue, &token).await {
            Err(JiraError::Unauthorized(reason)) => {
                log_warning(&format!(
                    "🔄 [TicketService] Jira recusou o token ({}), renovando e tentando de novo",
                    reason
                ));
                let token = self.token_manager.refresh_rejected(&token).await?;
                Ok(self.issue_creator.create(issue, &token).await?)
            }
            other => Ok(other?),
        }
    }
}
