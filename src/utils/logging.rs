use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_ticket_created(key: &str, title: &str) {
    info!("🎫 Jira issue created successfully: {} - Title: {}", key, title);
}

pub fn log_ticket_failed(category: &str, error: &str) {
    error!("❌ Ticket creation failed [{}]: {}", category, error);
}

pub fn log_token_refreshed(expires_at: &str) {
    info!("🔄 [OAuth2] Access token refreshed - expires at {}", expires_at);
}

pub fn log_classifier_fallback(reason: &str) {
    warn!("⚠️ [Classifier] Using fallback classification: {}", reason);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 Jira ticket middleware server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_integration_status_check() {
    debug!("Integration status check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
