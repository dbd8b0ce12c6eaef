use serde::{Deserialize, Serialize};

use super::{IssueType, Priority};

/// Dados de uma issue a ser criada
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
    pub summary: String,
    pub description: String,
    pub issue_type: IssueType,
    pub priority: Priority,
    pub labels: Vec<String>,
    pub components: Vec<String>,
    /// accountId interno do Atlassian (nunca username)
    pub reporter_account_id: Option<String>,
}

/// Issue criada: chave (ex: `OPS-42`) e URL de navegação
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    pub url: String,
}
