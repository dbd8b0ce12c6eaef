use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use std::fmt;

use crate::auth::AuthError;
use jira::JiraError;

#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    Creation(JiraError),
    ConfigError(String),
    ValidationError(String),
    InternalError(String),
}

/// Categoria de falha exibida ao usuário final
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Auth,
    Provider,
    Transient,
    Input,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Auth => "auth",
            FailureCategory::Provider => "provider",
            FailureCategory::Transient => "transient",
            FailureCategory::Input => "input",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    pub fn category(&self) -> FailureCategory {
        match self {
            AppError::Auth(AuthError::Transient(_)) => FailureCategory::Transient,
            AppError::Auth(_) => FailureCategory::Auth,
            AppError::Creation(JiraError::Unauthorized(_)) => FailureCategory::Auth,
            AppError::Creation(e) if e.is_transient() => FailureCategory::Transient,
            AppError::Creation(_) => FailureCategory::Provider,
            AppError::ValidationError(_) => FailureCategory::Input,
            AppError::ConfigError(_) | AppError::InternalError(_) => FailureCategory::Provider,
        }
    }

    /// Mensagem segura para o usuário final
    ///
    /// Nunca inclui corpo de resposta dos provedores nem credenciais; o detalhe
    /// completo vai para o log.
    pub fn user_notice(&self) -> String {
        match self {
            AppError::ValidationError(msg) => format!(
                "❌ Ticket creation failed: {}\n\n💡 Tip: use #ticket followed by a description of your issue.",
                msg
            ),
            AppError::Auth(AuthError::Unauthenticated)
            | AppError::Auth(AuthError::ReauthorizationRequired(_)) => {
                "❌ Ticket creation failed: the Jira connection needs to be (re)authorized by an administrator.".to_string()
            }
            _ => match self.category() {
                FailureCategory::Transient => {
                    "❌ Ticket creation failed: Jira is temporarily unreachable. Please try again in a moment.".to_string()
                }
                FailureCategory::Auth => {
                    "❌ Ticket creation failed: Jira refused our credentials. An administrator has been notified.".to_string()
                }
                _ => "❌ Ticket creation failed: Jira rejected the request. An administrator has been notified.".to_string(),
            },
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth(err) => write!(f, "Auth error: {}", err),
            AppError::Creation(err) => write!(f, "Jira issue creation error: {}", err),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<JiraError> for AppError {
    fn from(err: JiraError) -> Self {
        AppError::Creation(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Auth(AuthError::InvalidCallback(_)) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::Unauthenticated)
            | AppError::Auth(AuthError::ReauthorizationRequired(_)) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::Transient(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Auth(AuthError::Rejected(_)) => StatusCode::BAD_GATEWAY,
            AppError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Creation(e) if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Creation(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Erros de provedor não vazam para o cliente HTTP
        let error_message = match &self {
            AppError::Creation(_) => self.user_notice(),
            _ => self.to_string(),
        };

        let body = json!({
            "error": error_message,
            "category": self.category(),
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
