/// Main Application: Jira Ticket Middleware
///
/// Arquitetura:
/// - Canal de chat envia mensagens para /webhooks/message
/// - Mensagens com #ticket são classificadas (OpenRouter ou fallback)
/// - Issue criada no Jira Cloud via OAuth 2.0 (3LO)
/// - Administrador autoriza uma vez em /auth/jira; tokens persistidos em disco

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

// Importar módulos da biblioteca
use jira_ticket_middleware::{auth, config, utils, AppState};

mod handlers;

use auth::FileTokenStore;
use config::Settings;
use handlers::{comprehensive_health_check, handle_message, health_check, ready_check, status_check};
use utils::logging::*;

/// Rotas da aplicação
fn build_router(app_state: Arc<AppState>) -> Router {
    let oauth_state = app_state.oauth_state();
    let admin = app_state.admin.clone();

    Router::new()
        // Health checks (públicos)
        .route("/health", get(health_check))
        .route("/health/comprehensive", get(comprehensive_health_check))
        .route("/ready", get(ready_check))
        .route("/status", get(status_check))
        // Mensagens dos canais de chat
        .route("/webhooks/message", post(handle_message))
        .with_state(app_state)
        // OAuth2: /auth/jira (GET/DELETE, X-Admin-Key), /auth/callback (público)
        .merge(auth::handlers::router(oauth_state, admin))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Inicializar tracing (RUST_LOG, padrão info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Carregar configurações
    let settings = Settings::new().context("Failed to load settings")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    let store = Arc::new(FileTokenStore::new(&settings.oauth.token_file));
    log_info(&format!("🔐 Tokens persistidos em {}", store.path().display()));

    let app_state = Arc::new(
        AppState::build(settings.clone(), store).map_err(|e| anyhow::anyhow!("Failed to initialize services: {}", e))?,
    );

    if !app_state.admin.is_configured() {
        log_warning("⚠️ ADMIN_API_KEY não configurado: /auth/jira sem proteção fora de produção");
    }

    if app_state.token_manager.is_authenticated().await {
        log_info("✅ Autorização Jira carregada do disco");
    } else {
        log_warning("⚠️ Jira ainda não autorizado: acesse /auth/jira para autorizar");
    }

    // Refresh proativo opcional (mantém o refresh token vivo em períodos ociosos)
    let _background_refresh = settings
        .oauth
        .background_refresh_seconds
        .filter(|secs| *secs > 0)
        .map(|secs| {
            log_info(&format!("🔄 Refresh em background a cada {}s", secs));
            app_state.token_manager.spawn_background_refresh(Duration::from_secs(secs))
        });

    let app = build_router(app_state);

    // Iniciar servidor
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(settings.server.port);
    let listener = TcpListener::bind(format!("{}:{}", settings.server.host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", settings.server.host, port))?;

    log_server_startup(port);
    log_server_ready(port);

    // Graceful shutdown com signal handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("Failed to install Ctrl+C handler: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log_error(&format!("Failed to install SIGTERM handler: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use httpmock::prelude::*;
    use jira_ticket_middleware::auth::{MemoryTokenStore, TokenRecord, TokenStore};
    use serde_json::{json, Value};
    use std::collections::BTreeSet;
    use tower::ServiceExt;

    fn settings_for(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.oauth.client_id = "cid".to_string();
        settings.oauth.client_secret = "csecret".to_string();
        settings.oauth.token_url = server.url("/oauth/token");
        settings.jira.site_url = "https://acme.atlassian.net".to_string();
        settings.jira.project_key = "OPS".to_string();
        settings.jira.api_gateway_url = server.base_url();
        settings.jira.cloud_id = Some("cloud-1".to_string());
        settings
    }

    fn authorized_store() -> Arc<dyn TokenStore> {
        Arc::new(MemoryTokenStore::with_record(TokenRecord {
            access_token: "at-1".to_string(),
            refresh_token: "rt-1".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            scope: BTreeSet::from(["write:jira-work".to_string()]),
        }))
    }

    fn app(server: &MockServer, store: Arc<dyn TokenStore>) -> Router {
        build_router(Arc::new(AppState::build(settings_for(server), store).unwrap()))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start_async().await;
        let response = app(&server, Arc::new(MemoryTokenStore::new()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "jira-ticket-middleware");
    }

    #[tokio::test]
    async fn test_comprehensive_health() {
        let server = MockServer::start_async().await;
        let info = server
            .mock_async(|when, then| {
                when.method(GET).path("/ex/jira/cloud-1/rest/api/3/serverInfo");
                then.status(200).json_body(json!({ "version": "1001.0.0", "deploymentType": "Cloud" }));
            })
            .await;
        let app = app(&server, authorized_store());

        let response = app
            .clone()
            .oneshot(Request::get("/health/comprehensive").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["overall_status"], "healthy");
        assert_eq!(body["services"]["jira"]["status"], "healthy");
        assert_eq!(body["services"]["text_generator"]["status"], "not_configured");
        assert!(!body.to_string().contains("at-1"));

        let response = app
            .oneshot(Request::get("/health/comprehensive").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["cached"], true);
        info.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_ready_requires_authorization() {
        let server = MockServer::start_async().await;

        let response = app(&server, Arc::new(MemoryTokenStore::new()))
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(&server, authorized_store())
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_never_exposes_tokens() {
        let server = MockServer::start_async().await;
        let response = app(&server, authorized_store())
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["integrations"]["jira"]["oauth"]["authenticated"], true);
        assert_eq!(body["integrations"]["jira"]["handshake"], "unauthenticated");
        let text = body.to_string();
        assert!(!text.contains("at-1"));
        assert!(!text.contains("rt-1"));
    }

    #[tokio::test]
    async fn test_message_creates_ticket() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/ex/jira/cloud-1/rest/api/3/issue");
                then.status(201).json_body(json!({ "id": "10001", "key": "OPS-1" }));
            })
            .await;

        let response = app(&server, authorized_store())
            .oneshot(
                Request::post("/webhooks/message")
                    .header("content-type", "application/json")
                    .body(Body::from(r##"{"text": "#ticket Login fails with error 500 on mobile"}"##))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["reply"]["status"], "created");
        assert_eq!(body["reply"]["key"], "OPS-1");
        assert!(body["message"].as_str().unwrap().contains("https://acme.atlassian.net/browse/OPS-1"));
        create.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_message_invalid_json_is_bad_request() {
        let server = MockServer::start_async().await;
        let response = app(&server, authorized_store())
            .oneshot(
                Request::post("/webhooks/message")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
