/// Middleware de autenticação para endpoints administrativos
///
/// Valida que a requisição contém um API key válido no header X-Admin-Key.
/// Protege iniciar e revogar a autorização Jira de acesso anônimo.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::config::ServerSettings;
use crate::utils::constant_time_eq;

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Key esperado e ambiente, resolvidos uma vez a partir das configurações
#[derive(Debug, Clone)]
pub struct AdminAccess {
    expected_key: Option<String>,
    is_production: bool,
}

impl AdminAccess {
    pub fn new(expected_key: Option<String>, is_production: bool) -> Self {
        Self {
            expected_key: expected_key.filter(|key| !key.trim().is_empty()),
            is_production,
        }
    }

    pub fn from_settings(server: &ServerSettings) -> Self {
        Self::new(
            server.admin_api_key.clone(),
            server.environment.eq_ignore_ascii_case("production"),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.expected_key.is_some()
    }
}

/// Middleware que requer API key para /auth/jira (GET e DELETE)
///
/// # Configuração
///
/// ```bash
/// export ADMIN_API_KEY="your-secure-random-key-here"
/// ```
///
/// # Uso na requisição
///
/// ```bash
/// # URL de consentimento (abrir o Location no navegador)
/// curl -i -H "X-Admin-Key: your-secure-random-key-here" https://bot.example/auth/jira
/// curl -X DELETE -H "X-Admin-Key: your-secure-random-key-here" https://bot.example/auth/jira
/// ```
///
/// # Respostas
///
/// - **401 Unauthorized**: Key ausente ou inválido
/// - **503 Service Unavailable**: key não configurado em produção
///
/// Em desenvolvimento, sem ADMIN_API_KEY configurado, o acesso é liberado com warning.
pub async fn require_admin_key(
    State(access): State<Arc<AdminAccess>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let provided_key = headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());

    match (access.expected_key.as_deref(), provided_key, access.is_production) {
        // Key configurado e correto
        (Some(expected), Some(provided), _) if constant_time_eq(expected, provided) => {
            tracing::debug!("✅ Admin access granted");
            Ok(next.run(request).await)
        }

        // Key configurado mas incorreto/ausente
        (Some(_), provided, _) => {
            tracing::warn!(
                "❌ Admin access denied - Invalid or missing X-Admin-Key: {:?}",
                provided.map(|_| "<redacted>")
            );
            Err(unauthorized_response())
        }

        (None, _, false) => {
            tracing::warn!(
                "⚠️  ADMIN_API_KEY not configured - Allowing access in development mode. \
                 Configure ADMIN_API_KEY in production!"
            );
            Ok(next.run(request).await)
        }

        (None, _, true) => {
            tracing::error!("🚨 ADMIN_API_KEY not configured in production! Blocking admin access.");
            Err(service_unavailable_response())
        }
    }
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Unauthorized",
            "message": "Missing or invalid X-Admin-Key header",
            "hint": "Include X-Admin-Key header with valid API key"
        })),
    )
        .into_response()
}

fn service_unavailable_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "Service Unavailable",
            "message": "ADMIN_API_KEY not configured on server",
            "hint": "Contact administrator to configure ADMIN_API_KEY"
        })),
    )
        .into_response()
}
