//! OAuth2 HTTP Handlers
//!
//! Endpoints HTTP para iniciar, completar e revogar a autorização Jira.
//! Nenhuma página exibe tokens.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{AuthError, AuthorizationFlow, CallbackOutcome, TokenManager};
use crate::middleware::{require_admin_key, AdminAccess};
use crate::utils::logging::*;
use crate::utils::AppError;

/// Parâmetros do callback OAuth2
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    code: Option<String>,
    state: Option<String>,
    /// Erro retornado pela Atlassian (ex: access_denied)
    error: Option<String>,
    error_description: Option<String>,
}

/// State compartilhado para os handlers OAuth2
pub struct OAuth2State {
    pub flow: Arc<AuthorizationFlow>,
    pub token_manager: TokenManager,
}

/// Rotas `/auth/*`
///
/// `/auth/jira` exige X-Admin-Key; `/auth/callback` fica público porque é a
/// Atlassian que redireciona o navegador para ele (o nonce protege o callback).
pub fn router(state: Arc<OAuth2State>, admin: Arc<AdminAccess>) -> Router {
    let admin_routes = Router::new()
        .route("/auth/jira", get(start_oauth_flow).delete(revoke_authorization))
        .layer(middleware::from_fn_with_state(admin, require_admin_key));

    Router::new()
        .route("/auth/callback", get(handle_oauth_callback))
        .merge(admin_routes)
        .with_state(state)
}

/// GET /auth/jira
///
/// Redireciona para a página de consentimento da Atlassian com um nonce novo
pub async fn start_oauth_flow(State(oauth_state): State<Arc<OAuth2State>>) -> Redirect {
    log_request_received("/auth/jira", "GET");

    let auth_url = oauth_state.flow.authorization_url().await;

    Redirect::to(&auth_url)
}

/// GET /auth/callback?code=XXX&state=YYY
pub async fn handle_oauth_callback(
    State(oauth_state): State<Arc<OAuth2State>>,
    Query(params): Query<OAuthCallbackParams>,
) -> Response {
    log_info("📥 [OAuth2] Callback recebido");

    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        log_error(&format!("❌ [OAuth2] Erro na autorização: {} {}", error, description));
        oauth_state.flow.abort(params.state.as_deref(), &error).await;
        return (StatusCode::BAD_REQUEST, render_error_page(&format!("{} {}", error, description))).into_response();
    }

    let (Some(code), Some(state)) = (params.code, params.state) else {
        log_error("❌ [OAuth2] Callback sem code ou state");
        return (StatusCode::BAD_REQUEST, render_error_page("Missing code or state parameter")).into_response();
    };

    match oauth_state.flow.complete(&code, &state).await {
        Ok(outcome) => render_success_page(&outcome).into_response(),
        Err(e) => {
            let status = match e {
                AuthError::InvalidCallback(_) => StatusCode::BAD_REQUEST,
                AuthError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, render_error_page(&e.to_string())).into_response()
        }
    }
}

/// DELETE /auth/jira
pub async fn revoke_authorization(
    State(oauth_state): State<Arc<OAuth2State>>,
) -> Result<Json<serde_json::Value>, AppError> {
    log_request_received("/auth/jira", "DELETE");

    oauth_state.token_manager.deauthorize().await?;

    Ok(Json(json!({
        "success": true,
        "message": "Jira authorization removed",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const PAGE_STYLE: &str = r#"
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
           max-width: 700px; margin: 50px auto; padding: 20px; background: #f5f5f5; }
    .container { background: white; padding: 30px; border-radius: 12px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
    .success { background: #d4edda; border: 2px solid #28a745; padding: 20px; border-radius: 8px; }
    .warning { background: #fff3cd; border: 2px solid #ffc107; padding: 20px; border-radius: 8px; margin-top: 20px; }
    .error { background: #f8d7da; border: 2px solid #dc3545; padding: 20px; border-radius: 8px; }
    h1 { margin-top: 0; }
    a { color: #007bff; text-decoration: none; font-weight: bold; }
"#;

/// Renderizar página de sucesso
fn render_success_page(outcome: &CallbackOutcome) -> Html<String> {
    let mut notes = String::new();

    if !outcome.persisted {
        notes.push_str(
            r#"<div class="warning"><p>⚠️ The token could not be written to disk. It works until the next restart; check the service logs.</p></div>"#,
        );
    }
    if !outcome.can_refresh {
        notes.push_str(
            r#"<div class="warning"><p>⚠️ No refresh token was granted (is <code>offline_access</code> in the scopes?). Authorization will have to be repeated when the access token expires.</p></div>"#,
        );
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Jira OAuth - Success</title>
    <meta charset="UTF-8">
    <style>{}</style>
</head>
<body>
    <div class="container">
        <div class="success">
            <h1>✅ Jira authorization complete</h1>
            <p>Access expires at {} and is renewed automatically.</p>
            <p>Granted scopes: {}</p>
        </div>
        {}
        <p>You can close this window.</p>
    </div>
</body>
</html>"#,
        PAGE_STYLE,
        outcome.expires_at.to_rfc3339(),
        html_escape(&outcome.scope.join(", ")),
        notes
    ))
}

/// Renderizar página de erro
fn render_error_page(error: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Jira OAuth - Error</title>
    <meta charset="UTF-8">
    <style>{}</style>
</head>
<body>
    <div class="container">
        <div class="error">
            <h1>❌ Authorization failed</h1>
            <p><strong>Error:</strong> {}</p>
            <p>Re-authorization is required: <a href="/auth/jira">start again</a></p>
        </div>
    </div>
</body>
</html>"#,
        PAGE_STYLE,
        html_escape(error)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_store::MemoryTokenStore;
    use crate::auth::{OAuth2Config, OAuthClient};
    use crate::config::OAuthSettings;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use httpmock::prelude::*;
    use tower::ServiceExt;

    const ADMIN_KEY: &str = "admin-key-123";

    fn app_for(server: &MockServer) -> (Router, Arc<OAuth2State>) {
        app_with_admin(server, AdminAccess::new(None, false))
    }

    fn app_with_admin(server: &MockServer, admin: AdminAccess) -> (Router, Arc<OAuth2State>) {
        let config = OAuth2Config::from_settings(&OAuthSettings {
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            redirect_uri: "https://bot.example/auth/callback".to_string(),
            token_url: server.url("/oauth/token"),
            ..OAuthSettings::default()
        })
        .unwrap();
        let oauth = Arc::new(OAuthClient::new(config).unwrap());
        let token_manager = TokenManager::new(oauth.clone(), Arc::new(MemoryTokenStore::new()), 60);
        let state = Arc::new(OAuth2State {
            flow: Arc::new(AuthorizationFlow::new(oauth, token_manager.clone(), 600)),
            token_manager,
        });
        (router(state.clone(), Arc::new(admin)), state)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_start_redirects_to_atlassian() {
        let server = MockServer::start_async().await;
        let (app, _) = app_for(&server);

        let response = app
            .oneshot(Request::get("/auth/jira").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://auth.atlassian.com/authorize?"));
        assert!(location.contains("state="));
    }

    #[tokio::test]
    async fn test_callback_success_never_shows_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/token");
                then.status(200).json_body(serde_json::json!({
                    "access_token": "super-secret-access",
                    "refresh_token": "super-secret-refresh",
                    "expires_in": 3600,
                    "scope": "offline_access"
                }));
            })
            .await;
        let (app, state) = app_for(&server);

        let url = state.flow.authorization_url().await;
        let nonce = url.rsplit("state=").next().unwrap().to_string();

        let response = app
            .oneshot(
                Request::get(format!("/auth/callback?code=abc&state={}", nonce))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("authorization complete"));
        assert!(!body.contains("super-secret"));
        assert!(state.token_manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_callback_with_unknown_state_asks_for_reauthorization() {
        let server = MockServer::start_async().await;
        let (app, state) = app_for(&server);
        state.flow.authorization_url().await;

        let response = app
            .oneshot(
                Request::get("/auth/callback?code=abc&state=forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("Re-authorization is required"));
    }

    #[tokio::test]
    async fn test_callback_error_param_is_escaped() {
        let server = MockServer::start_async().await;
        let (app, _) = app_for(&server);

        let response = app
            .oneshot(
                Request::get("/auth/callback?error=%3Cscript%3E")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_text(response).await;
        assert!(body.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_delete_deauthorizes() {
        let server = MockServer::start_async().await;
        let (app, state) = app_for(&server);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/auth/jira")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!state.token_manager.is_authenticated().await);
    }

    fn delete_request(key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::DELETE).uri("/auth/jira");
        if let Some(key) = key {
            builder = builder.header("X-Admin-Key", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn authorize(state: &OAuth2State) {
        state
            .token_manager
            .install(crate::auth::TokenRecord {
                access_token: "at-1".to_string(),
                refresh_token: "rt-1".to_string(),
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
                scope: Default::default(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_requires_admin_key() {
        let server = MockServer::start_async().await;
        let (app, state) = app_with_admin(&server, AdminAccess::new(Some(ADMIN_KEY.to_string()), true));
        authorize(&state).await;

        for key in [None, Some("wrong")] {
            let response = app.clone().oneshot(delete_request(key)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert!(state.token_manager.is_authenticated().await);

        let response = app.oneshot(delete_request(Some(ADMIN_KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!state.token_manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_start_requires_admin_key_but_callback_is_public() {
        let server = MockServer::start_async().await;
        let (app, state) = app_with_admin(&server, AdminAccess::new(Some(ADMIN_KEY.to_string()), true));

        let response = app
            .clone()
            .oneshot(Request::get("/auth/jira").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.flow.state().await.as_str(), "unauthenticated");

        let response = app
            .clone()
            .oneshot(
                Request::get("/auth/jira")
                    .header("X-Admin-Key", ADMIN_KEY)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_redirection());

        // Sem header: responde a página de erro do callback, não 401
        let response = app
            .oneshot(
                Request::get("/auth/callback?code=abc&state=forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_production_without_admin_key_blocks_revoke() {
        let server = MockServer::start_async().await;
        let (app, state) = app_with_admin(&server, AdminAccess::new(None, true));
        authorize(&state).await;

        let response = app.oneshot(delete_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(state.token_manager.is_authenticated().await);
    }
}
