use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use jira_ticket_middleware::utils::logging::*;
use jira_ticket_middleware::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "jira-ticket-middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Pronto somente com autorização Jira instalada
pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    log_integration_status_check();

    let authenticated = state.token_manager.is_authenticated().await;

    let response = json!({
        "ready": authenticated,
        "service": "jira-ticket-middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "jira_oauth": {
                "status": if authenticated { "authorized" } else { "not_authorized" },
                "authorize_at": "/auth/jira"
            }
        }
    });

    let status = if authenticated {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Verifica Jira (serverInfo) e o gerador de texto; 503 se algum estiver fora
pub async fn comprehensive_health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    log_health_check();

    let report = state.health.check().await;

    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(json!(report)))
}

pub async fn status_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_integration_status_check();

    let token = state.token_manager.status().await;
    let handshake = state.flow.state().await;
    let settings = &state.settings;

    Json(json!({
        "service": "jira-ticket-middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()),
        "tickets": state.tickets.stats(),
        "integrations": {
            "jira": {
                "site_url": settings.jira.site_url,
                "project_key": settings.jira.project_key,
                "cloud_id_configured": settings.jira.cloud_id.is_some(),
                "oauth": token,
                "handshake": handshake.as_str()
            },
            "classifier": {
                "model_enabled": state.tickets.classifier().is_model_enabled(),
                "model": settings.llm.model
            },
            "bot": {
                "trigger_marker": state.tickets.processor().marker()
            }
        }
    }))
}
