use jira::{IssueType, NewIssue, Priority};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::utils::{collapse_whitespace, truncate_at_word_boundary, truncate_chars};

/// Limite do título (linha única, espaços colapsados)
pub const TITLE_MAX_CHARS: usize = 100;

/// Quantidade máxima de labels (ordem preservada)
pub const MAX_LABELS: usize = 5;

/// Campos classificados de um ticket
///
/// Imutável depois de construído; os limites de título e labels são aplicados
/// no construtor, então qualquer instância já os respeita.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedTicket {
    title: String,
    description: String,
    priority: Priority,
    issue_type: IssueType,
    labels: Vec<String>,
    components: BTreeSet<String>,
}

impl ClassifiedTicket {
    pub fn new(
        title: &str,
        description: impl Into<String>,
        priority: Priority,
        issue_type: IssueType,
        labels: impl IntoIterator<Item = String>,
        components: impl IntoIterator<Item = String>,
    ) -> Self {
        let labels = labels
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .take(MAX_LABELS)
            .collect();

        let components = components
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Self {
            title: truncate_chars(&collapse_whitespace(title), TITLE_MAX_CHARS),
            description: description.into(),
            priority,
            issue_type,
            labels,
            components,
        }
    }

    /// Classificação determinística usada quando o modelo falha
    pub fn fallback(raw_text: &str) -> Self {
        Self {
            title: truncate_at_word_boundary(&collapse_whitespace(raw_text), TITLE_MAX_CHARS),
            description: raw_text.to_string(),
            priority: Priority::Medium,
            issue_type: IssueType::Task,
            labels: Vec::new(),
            components: BTreeSet::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn issue_type(&self) -> IssueType {
        self.issue_type
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn components(&self) -> &BTreeSet<String> {
        &self.components
    }

    /// Payload para o crate jira
    pub fn to_new_issue(&self, reporter_account_id: Option<String>) -> NewIssue {
        NewIssue {
            summary: self.title.clone(),
            description: self.description.clone(),
            issue_type: self.issue_type,
            priority: self.priority,
            labels: self.labels.clone(),
            components: self.components.iter().cloned().collect(),
            reporter_account_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_hard_truncated() {
        let title = "t".repeat(250);
        let ticket = ClassifiedTicket::new(&title, "d", Priority::High, IssueType::Bug, vec![], vec![]);
        assert_eq!(ticket.title().chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_title_is_single_line() {
        let ticket = ClassifiedTicket::new(
            "  Checkout fails\n\n  on   Safari\t(iOS 17) ",
            "d",
            Priority::High,
            IssueType::Bug,
            vec![],
            vec![],
        );
        assert_eq!(ticket.title(), "Checkout fails on Safari (iOS 17)");
        assert_eq!(ticket.to_new_issue(None).summary, "Checkout fails on Safari (iOS 17)");
    }

    #[test]
    fn test_labels_capped_in_order() {
        let labels: Vec<String> = (1..=8).map(|i| format!("l{}", i)).collect();
        let ticket = ClassifiedTicket::new("t", "d", Priority::Low, IssueType::Task, labels, vec![]);
        assert_eq!(ticket.labels(), ["l1", "l2", "l3", "l4", "l5"]);
    }

    #[test]
    fn test_components_are_a_set() {
        let ticket = ClassifiedTicket::new(
            "t",
            "d",
            Priority::Low,
            IssueType::Task,
            vec![],
            vec!["api".to_string(), "api".to_string(), " ".to_string()],
        );
        assert_eq!(ticket.components().len(), 1);
    }

    #[test]
    fn test_fallback() {
        let text = "Login fails with error 500 on mobile";
        let ticket = ClassifiedTicket::fallback(text);

        assert_eq!(ticket.title(), text);
        assert_eq!(ticket.description(), text);
        assert_eq!(ticket.priority(), Priority::Medium);
        assert_eq!(ticket.issue_type(), IssueType::Task);
        assert!(ticket.labels().is_empty());
        assert!(ticket.components().is_empty());
    }

    #[test]
    fn test_fallback_long_input_cut_at_word() {
        let text = "word ".repeat(60);
        let ticket = ClassifiedTicket::fallback(&text);

        assert!(ticket.title().chars().count() <= TITLE_MAX_CHARS);
        assert!(ticket.title().ends_with("word"));
        assert_eq!(ticket.description(), text);
    }

    #[test]
    fn test_to_new_issue() {
        let ticket = ClassifiedTicket::new(
            "Crash on save",
            "desc",
            Priority::Highest,
            IssueType::Bug,
            vec!["editor".to_string()],
            vec!["core".to_string()],
        );
        let issue = ticket.to_new_issue(Some("acc-1".to_string()));
        assert_eq!(issue.summary, "Crash on save");
        assert_eq!(issue.components, vec!["core".to_string()]);
        assert_eq!(issue.reporter_account_id.as_deref(), Some("acc-1"));
    }
}
