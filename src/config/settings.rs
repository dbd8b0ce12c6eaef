use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub jira: JiraSettings,
    #[serde(default)]
    pub oauth: OAuthSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub bot: BotSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Exigido no header X-Admin-Key de /auth/jira
    pub admin_api_key: Option<String>,
    /// "production" bloqueia /auth/jira quando admin_api_key não está configurado
    pub environment: String,
    /// Validade do relatório de /health/comprehensive
    pub health_cache_seconds: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            admin_api_key: None,
            environment: "development".to_string(),
            health_cache_seconds: 300,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct JiraSettings {
    /// Site Cloud (ex: https://acme.atlassian.net)
    pub site_url: String,
    pub project_key: String,
    pub api_gateway_url: String,
    /// Se ausente, resolvido via accessible-resources no primeiro uso
    pub cloud_id: Option<String>,
    /// accountId usado como reporter quando a mensagem não informa um
    pub reporter_account_id: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for JiraSettings {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            project_key: String::new(),
            api_gateway_url: jira::client::DEFAULT_API_GATEWAY.to_string(),
            cloud_id: None,
            reporter_account_id: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub audience: String,
    pub scopes: Vec<String>,
    /// Arquivo JSON onde o TokenRecord é persistido
    pub token_file: String,
    pub refresh_margin_seconds: u64,
    pub timeout_seconds: u64,
    /// Intervalo do refresh proativo em background (desligado se ausente)
    pub background_refresh_seconds: Option<u64>,
    pub state_ttl_seconds: u64,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:8080/auth/callback".to_string(),
            authorize_url: "https://auth.atlassian.com/authorize".to_string(),
            token_url: "https://auth.atlassian.com/oauth/token".to_string(),
            audience: "api.atlassian.com".to_string(),
            scopes: vec![
                "read:jira-user".to_string(),
                "read:jira-work".to_string(),
                "write:jira-work".to_string(),
                "offline_access".to_string(),
            ],
            token_file: "data/jira_tokens.json".to_string(),
            refresh_margin_seconds: 60,
            timeout_seconds: 30,
            background_refresh_seconds: None,
            state_ttl_seconds: 600,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LlmSettings {
    /// Sem chave o classificador opera só com o fallback determinístico
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-2.5-flash-preview-05-20".to_string(),
            timeout_seconds: 30,
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BotSettings {
    pub trigger_marker: String,
    pub min_message_length: usize,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            trigger_marker: "#ticket".to_string(),
            min_message_length: 10,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("TICKET_BRIDGE")
                    .prefix_separator("__")
                    .separator("__"),
            );

        // Nomes convencionais das variáveis de ambiente têm prioridade
        const OVERRIDES: &[(&str, &str)] = &[
            ("JIRA_CLIENT_ID", "oauth.client_id"),
            ("JIRA_CLIENT_SECRET", "oauth.client_secret"),
            ("JIRA_REDIRECT_URI", "oauth.redirect_uri"),
            ("JIRA_CLOUD_URL", "jira.site_url"),
            ("JIRA_PROJECT_KEY", "jira.project_key"),
            ("JIRA_CLOUD_ID", "jira.cloud_id"),
            ("JIRA_TOKEN_FILE", "oauth.token_file"),
            ("OPENROUTER_API_KEY", "llm.api_key"),
            ("OPENROUTER_MODEL", "llm.model"),
            ("OPENROUTER_BASE_URL", "llm.base_url"),
            ("ADMIN_API_KEY", "server.admin_api_key"),
            ("RUST_ENV", "server.environment"),
        ];

        for (var, key) in OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    builder = builder.set_override(*key, value)?;
                }
            }
        }

        let s = builder.build()?;

        s.try_deserialize()
    }

    /// Verifica os campos sem os quais o serviço não consegue criar issues
    pub fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();

        if self.oauth.client_id.is_empty() {
            missing.push("oauth.client_id (JIRA_CLIENT_ID)");
        }
        if self.oauth.client_secret.is_empty() {
            missing.push("oauth.client_secret (JIRA_CLIENT_SECRET)");
        }
        if self.jira.site_url.is_empty() {
            missing.push("jira.site_url (JIRA_CLOUD_URL)");
        }
        if self.jira.project_key.is_empty() {
            missing.push("jira.project_key (JIRA_PROJECT_KEY)");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required settings: {}", missing.join(", ")))
        }
    }
}
