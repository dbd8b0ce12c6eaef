use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use jira_ticket_middleware::models::{InboundMessage, TicketReply};
use jira_ticket_middleware::utils::logging::*;
use jira_ticket_middleware::utils::AppError;
use jira_ticket_middleware::AppState;

/// POST /webhooks/message
///
/// Recebe `{text, reporter_account_id?, sender?}` de um canal de chat e devolve
/// a resposta a ser postada de volta. Falhas de criação também são 200: o
/// canal recebe `ok: false` e o aviso para o usuário.
pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InboundMessage>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let start_time = Instant::now();
    log_request_received("/webhooks/message", "POST");

    let Json(message) = payload.map_err(|e| {
        log_validation_error("payload", &e.body_text());
        AppError::ValidationError(format!("Invalid message payload: {}", e.body_text()))
    })?;

    let reply = state.tickets.handle(message).await;
    let ok = !matches!(reply, TicketReply::Failed { .. });
    let text = reply.message();

    log_request_processed("/webhooks/message", 200, start_time.elapsed().as_millis() as u64);

    Ok(Json(json!({
        "ok": ok,
        "reply": reply,
        "message": text
    })))
}
