//! Tipos de issue suportados na criação

use serde::{Deserialize, Serialize};

/// Tipo de issue (campo `issuetype.name`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    Bug,
    Task,
    Story,
    Epic,
    Improvement,
    #[serde(rename = "New Feature")]
    NewFeature,
}

impl IssueType {
    pub const ALL: [IssueType; 6] = [
        IssueType::Bug,
        IssueType::Task,
        IssueType::Story,
        IssueType::Epic,
        IssueType::Improvement,
        IssueType::NewFeature,
    ];

    /// Nome exato esperado pela API
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Bug => "Bug",
            IssueType::Task => "Task",
            IssueType::Story => "Story",
            IssueType::Epic => "Epic",
            IssueType::Improvement => "Improvement",
            IssueType::NewFeature => "New Feature",
        }
    }

    /// Converte a partir do nome exato (case-sensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl Default for IssueType {
    fn default() -> Self {
        IssueType::Task
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
