//! Cliente da API REST do Jira Cloud
//!
//! Este crate cobre o que o middleware precisa do Jira quando autenticado via
//! OAuth 2.0 (3LO):
//!
//! - Resolução do cloud id do site (`accessible-resources`)
//! - Conversão de texto para Atlassian Document Format
//! - Criação de issues com prioridade, tipo, labels, componentes e reporter
//! - `serverInfo` para health check
//!
//! O crate não gerencia tokens: cada chamada recebe um access token válido.
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use jira::{IssueCreator, JiraClient, NewIssue, IssueType, Priority};
//!
//! let client = JiraClient::new("https://acme.atlassian.net", jira::client::DEFAULT_API_GATEWAY, 30)?;
//! let creator = IssueCreator::new(client, "OPS");
//!
//! let created = creator.create(&NewIssue {
//!     summary: "Login fails".into(),
//!     description: "Login fails with error 500".into(),
//!     issue_type: IssueType::Bug,
//!     priority: Priority::High,
//!     labels: vec![],
//!     components: vec![],
//!     reporter_account_id: None,
//! }, &access_token).await?;
//! println!("{} -> {}", created.key, created.url);
//! ```

pub mod adf;
pub mod client;
pub mod error;
pub mod issues;
pub mod types;

pub use client::{JiraClient, ServerInfo};
pub use error::{JiraError, Result};
pub use issues::IssueCreator;
pub use types::{CreatedIssue, IssueType, NewIssue, Priority};
