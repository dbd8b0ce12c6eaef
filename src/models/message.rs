use serde::{Deserialize, Serialize};

use crate::utils::FailureCategory;

/// Mensagem recebida de um canal de chat
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub text: String,
    /// accountId Atlassian do autor, se o canal souber mapear
    #[serde(default)]
    pub reporter_account_id: Option<String>,
    /// Nome/username do autor, enviado como contexto ao classificador
    #[serde(default)]
    pub sender: Option<String>,
}

impl InboundMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reporter_account_id: None,
            sender: None,
        }
    }
}

/// Origem dos campos do ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Model,
    Fallback,
}

/// Resposta devolvida ao canal de chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TicketReply {
    Created {
        key: String,
        url: String,
        title: String,
        issue_type: String,
        priority: String,
        source: ClassificationSource,
    },
    /// Mensagem sem o marcador: nada a fazer
    Ignored,
    Failed {
        category: FailureCategory,
        notice: String,
    },
}

impl TicketReply {
    pub fn is_created(&self) -> bool {
        matches!(self, TicketReply::Created { .. })
    }

    /// Texto para o usuário final
    pub fn message(&self) -> Option<String> {
        match self {
            TicketReply::Created {
                key,
                url,
                title,
                issue_type,
                priority,
                source,
            } => {
                let mut text = format!(
                    "✅ Ticket created: {}\n\n📋 {}\n🏷️ Type: {}\n⚡ Priority: {}\n🔗 {}",
                    key, title, issue_type, priority, url
                );
                if *source == ClassificationSource::Fallback {
                    text.push_str("\n\n📊 Fields filled automatically (classifier unavailable)");
                }
                Some(text)
            }
            TicketReply::Ignored => None,
            TicketReply::Failed { notice, .. } => Some(notice.clone()),
        }
    }
}
