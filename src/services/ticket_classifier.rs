// ============================================================================
// Ticket Classifier - Texto livre → campos do ticket
// ============================================================================
//
// A saída do modelo é tratada como formato externo não confiável:
// - prioridade e tipo precisam estar exatamente nos conjuntos fechados
// - título e labels são cortados nos limites do ClassifiedTicket
// - qualquer falha (rede, timeout, status, JSON, enum) → fallback determinístico
//
// `classify` nunca falha.

use jira::{IssueType, Priority};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use super::openrouter::{LlmError, TextGenerator};
use crate::models::{ClassificationSource, ClassifiedTicket};
use crate::utils::logging::*;
use crate::utils::truncate_with_suffix;

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("response is not the expected JSON object: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("priority '{0}' is not one of Highest, High, Medium, Low, Lowest")]
    InvalidPriority(String),

    #[error("issue type '{0}' is not one of Bug, Task, Story, Epic, Improvement, New Feature")]
    InvalidIssueType(String),

    #[error("response has an empty title")]
    EmptyTitle,
}

/// Campos como o modelo devolve, antes da validação
#[derive(Debug, Deserialize)]
struct RawClassification {
    title: String,
    description: String,
    priority: String,
    issue_type: String,
    #[serde(default)]
    labels: Option<Vec<String>>,
    #[serde(default)]
    components: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct TicketClassifier {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl TicketClassifier {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn is_model_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn classify(&self, raw_text: &str) -> ClassifiedTicket {
        self.classify_with_context(raw_text, None).await.0
    }

    /// Classifica informando se os campos vieram do modelo ou do fallback
    pub async fn classify_with_context(
        &self,
        raw_text: &str,
        user_context: Option<&str>,
    ) -> (ClassifiedTicket, ClassificationSource) {
        match self.try_classify(raw_text, user_context).await {
            Ok(ticket) => {
                log_info(&format!(
                    "🤖 [Classifier] {} | {} | {}",
                    ticket.title(),
                    ticket.issue_type(),
                    ticket.priority()
                ));
                (ticket, ClassificationSource::Model)
            }
            Err(e) => {
                log_classifier_fallback(&e.to_string());
                (ClassifiedTicket::fallback(raw_text), ClassificationSource::Fallback)
            }
        }
    }

    async fn try_classify(
        &self,
        raw_text: &str,
        user_context: Option<&str>,
    ) -> Result<ClassifiedTicket, ClassificationError> {
        let generator = self.generator.as_ref().ok_or(LlmError::NotConfigured)?;

        log_info(&format!(
            "Processing message with text generator: {}",
            truncate_with_suffix(raw_text, 100, "...")
        ));

        let content = generator.complete(&build_prompt(raw_text, user_context)).await?;

        parse_classification(&content, raw_text)
    }
}

/// Valida a resposta do modelo e monta o ClassifiedTicket
pub fn parse_classification(content: &str, raw_text: &str) -> Result<ClassifiedTicket, ClassificationError> {
    let raw: RawClassification = serde_json::from_str(strip_code_fences(content))?;

    let priority = Priority::from_name(raw.priority.trim())
        .ok_or_else(|| ClassificationError::InvalidPriority(raw.priority.clone()))?;
    let issue_type = IssueType::from_name(raw.issue_type.trim())
        .ok_or_else(|| ClassificationError::InvalidIssueType(raw.issue_type.clone()))?;

    if raw.title.trim().is_empty() {
        return Err(ClassificationError::EmptyTitle);
    }

    let description = if raw.description.trim().is_empty() {
        raw_text.to_string()
    } else {
        raw.description
    };

    Ok(ClassifiedTicket::new(
        &raw.title,
        description,
        priority,
        issue_type,
        raw.labels.unwrap_or_default(),
        raw.components.unwrap_or_default(),
    ))
}

/// Modelos costumam embrulhar o JSON em ```json ... ```
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn build_prompt(message: &str, user_context: Option<&str>) -> String {
    let context = user_context
        .map(|c| format!("User Context: {}\n", c))
        .unwrap_or_default();

    format!(
        r#"You are an expert at analyzing messages and extracting structured ticket information for Jira.

Analyze the following message and extract ticket information in JSON format.

Message: "{message}"

{context}
Extract the following information and respond with ONLY a valid JSON object:

{{
    "title": "A concise, descriptive title (max 100 characters)",
    "description": "A detailed description expanding on the message content",
    "priority": "One of: Highest, High, Medium, Low, Lowest",
    "issue_type": "One of: Bug, Task, Story, Epic, Improvement, New Feature",
    "labels": ["relevant", "labels", "as", "array"],
    "components": ["affected", "components", "as", "array"]
}}

Guidelines:
- Title should be clear and actionable
- Description should provide context and details
- Priority should be based on urgency indicators in the message
- Issue type should be inferred from the content:
  * Bug: Error reports, things not working
  * Task: General work items, requests
  * Story: User-focused features
  * Improvement: Enhancements to existing features
  * New Feature: Completely new functionality
- Labels should be relevant keywords (max 5)
- Components should be system/module names if identifiable

Respond with ONLY the JSON object, no additional text."#
    )
}
