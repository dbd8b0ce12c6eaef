// Biblioteca do middleware de tickets Jira
// Expõe módulos para uso em testes e binários

pub mod auth;
pub mod config;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use auth::{AuthorizationFlow, OAuth2Config, OAuth2State, OAuthClient, TokenManager, TokenStore};
use middleware::AdminAccess;
use services::{HealthChecker, MessageProcessor, OpenRouterClient, TextGenerator, TicketClassifier, TicketService};
use utils::{AppError, AppResult};

// AppState é definido aqui para ser compartilhado
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub token_manager: TokenManager,
    pub flow: Arc<AuthorizationFlow>,
    pub tickets: TicketService,
    pub admin: Arc<AdminAccess>,
    pub health: Arc<HealthChecker>,
}

impl AppState {
    /// Monta todos os serviços a partir das configurações
    pub fn build(settings: config::Settings, store: Arc<dyn TokenStore>) -> AppResult<Self> {
        let oauth = Arc::new(OAuthClient::new(OAuth2Config::from_settings(&settings.oauth)?)?);

        let token_manager = TokenManager::new(
            oauth.clone(),
            store,
            settings.oauth.refresh_margin_seconds,
        );

        let flow = Arc::new(AuthorizationFlow::new(
            oauth,
            token_manager.clone(),
            settings.oauth.state_ttl_seconds,
        ));

        let mut jira_client = jira::JiraClient::new(
            &settings.jira.site_url,
            &settings.jira.api_gateway_url,
            settings.jira.timeout_seconds,
        )
        .map_err(|e| AppError::ConfigError(e.to_string()))?;
        if let Some(cloud_id) = settings.jira.cloud_id.as_deref().filter(|id| !id.is_empty()) {
            jira_client = jira_client.with_cloud_id(cloud_id);
        }
        let issue_creator = jira::IssueCreator::new(jira_client.clone(), &settings.jira.project_key);

        let generator = OpenRouterClient::from_settings(&settings.llm)
            .map_err(|e| AppError::ConfigError(format!("Failed to create text generation client: {}", e)))?
            .map(|client| Arc::new(client) as Arc<dyn TextGenerator>);

        let health = Arc::new(HealthChecker::new(
            token_manager.clone(),
            jira_client,
            generator.clone(),
            Duration::from_secs(settings.server.health_cache_seconds),
        ));

        let tickets = TicketService::new(
            MessageProcessor::new(&settings.bot)?,
            TicketClassifier::new(generator),
            token_manager.clone(),
            issue_creator,
            settings.jira.reporter_account_id.clone(),
        );

        let admin = Arc::new(AdminAccess::from_settings(&settings.server));

        Ok(Self {
            settings,
            token_manager,
            flow,
            tickets,
            admin,
            health,
        })
    }

    /// State das rotas `/auth/*`
    pub fn oauth_state(&self) -> Arc<OAuth2State> {
        Arc::new(OAuth2State {
            flow: self.flow.clone(),
            token_manager: self.token_manager.clone(),
        })
    }
}
