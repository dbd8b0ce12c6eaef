//! Tipos da API do Jira
//!
//! - **Priority**: cinco prioridades padrão (Highest..Lowest)
//! - **IssueType**: Bug, Task, Story, Epic, Improvement, New Feature
//! - **NewIssue / CreatedIssue**: entrada e saída da criação de issue
//!
//! ## ⚠️ Notas Importantes
//!
//! - **Descrição**: a API v3 só aceita Atlassian Document Format (ver `adf`)
//! - **Reporter**: sempre `accountId`, nunca username (rejeitado na v3)
//! - **Labels**: não podem conter espaços

pub mod issue;
pub mod issue_type;
pub mod priority;

pub use issue::{CreatedIssue, NewIssue};
pub use issue_type::IssueType;
pub use priority::Priority;
