//! Detecção do marcador `#ticket` e validação do conteúdo da mensagem

use regex::Regex;
use std::collections::HashSet;

use crate::config::BotSettings;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct MessageProcessor {
    marker: String,
    marker_pattern: Regex,
    min_message_length: usize,
}

impl MessageProcessor {
    pub fn new(settings: &BotSettings) -> AppResult<Self> {
        let marker = settings.trigger_marker.trim();
        if marker.is_empty() {
            return Err(AppError::ConfigError("bot.trigger_marker must not be empty".to_string()));
        }

        // Case-insensitive, palavra inteira
        let marker_pattern = Regex::new(&format!(r"(?i){}\b", regex::escape(marker)))
            .map_err(|e| AppError::ConfigError(format!("invalid trigger marker: {}", e)))?;

        Ok(Self {
            marker: marker.to_string(),
            marker_pattern,
            min_message_length: settings.min_message_length,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn contains_marker(&self, text: &str) -> bool {
        self.marker_pattern.is_match(text)
    }

    /// Remove o marcador e colapsa espaços
    pub fn extract_content(&self, text: &str) -> String {
        let without_marker = self.marker_pattern.replace_all(text, "");
        without_marker.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Devolve o conteúdo pronto para classificação
    pub fn validate(&self, text: &str) -> AppResult<String> {
        if text.trim().is_empty() {
            return Err(AppError::ValidationError("message is empty".to_string()));
        }

        if !self.contains_marker(text) {
            return Err(AppError::ValidationError(format!(
                "message does not contain {}",
                self.marker
            )));
        }

        let content = self.extract_content(text);

        if content.chars().count() < self.min_message_length {
            return Err(AppError::ValidationError(format!(
                "ticket content too short (minimum {} characters)",
                self.min_message_length
            )));
        }

        if is_spam_like(&content) {
            return Err(AppError::ValidationError(
                "message appears to be spam or invalid".to_string(),
            ));
        }

        Ok(content)
    }

    pub fn help_message(&self) -> String {
        let m = &self.marker;
        format!(
            "🎫 Ticket Creation Help\n\n\
             To create a Jira ticket, send a message containing {m} followed by your issue description.\n\n\
             Examples:\n\
             • {m} The login button is not working on mobile\n\
             • {m} High priority: Database timeout errors\n\
             • {m} Feature request: Add dark mode to dashboard\n\n\
             Tips:\n\
             • Be descriptive, more details help create better tickets\n\
             • Include priority indicators (high, urgent, low) if needed\n\
             • Mention affected components or areas when possible\n\n\
             You will get back the ticket key and a link to it."
        )
    }
}

/// Repetição excessiva (menos de 30% de palavras únicas) ou excesso de símbolos
pub fn is_spam_like(content: &str) -> bool {
    let lowered = content.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.len() > 3 {
        let unique: HashSet<&&str> = words.iter().collect();
        if (unique.len() as f64) / (words.len() as f64) < 0.3 {
            return true;
        }
    }

    let total = content.chars().count();
    if total == 0 {
        return false;
    }
    let special = content
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();

    (special as f64) / (total as f64) > 0.5
}
