// ============================================================================
// Issue Creator - Criação de issues no Jira
// ============================================================================
//
// Monta e envia o payload de `POST /rest/api/3/issue`:
//
// - descrição convertida para ADF (texto puro é rejeitado)
// - reporter por accountId (username é rejeitado na v3)
// - labels sem espaços
//
// Não há retry interno: a falha volta como está para o chamador decidir.

use crate::adf;
use crate::client::JiraClient;
use crate::error::Result;
use crate::types::{CreatedIssue, NewIssue};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Limite do campo `summary` na API
pub const SUMMARY_MAX_CHARS: usize = 255;

#[derive(Debug, Deserialize)]
struct CreateIssueResponse {
    id: String,
    key: String,
}

/// Cria issues em um projeto fixo
#[derive(Clone)]
pub struct IssueCreator {
    client: JiraClient,
    project_key: String,
}

impl IssueCreator {
    pub fn new(client: JiraClient, project_key: impl Into<String>) -> Self {
        Self {
            client,
            project_key: project_key.into(),
        }
    }

    pub fn project_key(&self) -> &str {
        &self.project_key
    }

    /// Cria a issue e retorna chave + URL de navegação
    ///
    /// # Erros
    ///
    /// - `JiraError::Unauthorized`: token rejeitado (401)
    /// - `JiraError::ApiError`: payload rejeitado (projeto inválido, permissão, campos)
    /// - `JiraError::HttpError`: falha de rede/timeout
    /// - `JiraError::JsonError`: issue aceita, mas resposta sem `id`/`key`
    pub async fn create(&self, issue: &NewIssue, access_token: &str) -> Result<CreatedIssue> {
        let body = build_payload(&self.project_key, issue);

        tracing::info!(
            "Creating Jira issue in {}: {} ({}, {})",
            self.project_key,
            issue.summary,
            issue.issue_type,
            issue.priority
        );

        let created: CreateIssueResponse = self.client.post_json(access_token, "/issue", &body).await?;

        let url = self.client.browse_url(&created.key);

        tracing::info!("✅ Jira issue created: {} - {}", created.key, url);

        Ok(CreatedIssue {
            id: created.id,
            key: created.key,
            url,
        })
    }
}

/// Monta o corpo `{ "fields": { ... } }`
pub fn build_payload(project_key: &str, issue: &NewIssue) -> Value {
    let mut fields = Map::new();

    fields.insert("project".into(), json!({ "key": project_key }));
    fields.insert(
        "summary".into(),
        json!(issue.summary.chars().take(SUMMARY_MAX_CHARS).collect::<String>()),
    );
    fields.insert("description".into(), adf::text_to_document(&issue.description));
    fields.insert("issuetype".into(), json!({ "name": issue.issue_type.as_str() }));
    fields.insert("priority".into(), json!({ "name": issue.priority.as_str() }));

    let labels: Vec<String> = issue
        .labels
        .iter()
        .map(|l| sanitize_label(l))
        .filter(|l| !l.is_empty())
        .collect();
    if !labels.is_empty() {
        fields.insert("labels".into(), json!(labels));
    }

    if !issue.components.is_empty() {
        let components: Vec<Value> = issue
            .components
            .iter()
            .map(|name| json!({ "name": name }))
            .collect();
        fields.insert("components".into(), Value::Array(components));
    }

    if let Some(account_id) = issue.reporter_account_id.as_deref().filter(|id| !id.is_empty()) {
        fields.insert("reporter".into(), json!({ "accountId": account_id }));
    }

    json!({ "fields": fields })
}

/// Labels do Jira não aceitam espaços
fn sanitize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join("-")
}
