//! Níveis de prioridade aceitos pelo Jira
//!
//! O esquema padrão do Jira Cloud tem exatamente cinco prioridades:
//! - Highest
//! - High
//! - Medium (padrão)
//! - Low
//! - Lowest
//!
//! O conjunto é fechado: qualquer outro nome é rejeitado em `from_name`.

use serde::{Deserialize, Serialize};

/// Prioridade de uma issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Highest,
    High,
    Medium,
    Low,
    Lowest,
}

impl Priority {
    /// Todas as prioridades, da mais alta para a mais baixa
    pub const ALL: [Priority; 5] = [
        Priority::Highest,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::Lowest,
    ];

    /// Nome exato usado no campo `priority.name` da API
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Highest => "Highest",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Lowest => "Lowest",
        }
    }

    /// Converte a partir do nome exato (case-sensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
