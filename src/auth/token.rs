//! TokenRecord: par access/refresh token com expiração absoluta

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::utils::truncate_safe;

/// Resposta do token endpoint (`authorization_code` e `refresh_token`)
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Calculado uma única vez: `issued_at + expires_in`
    pub expires_at: DateTime<Utc>,
    pub scope: BTreeSet<String>,
}

impl TokenRecord {
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let scope = response
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(String::from)
            .collect();

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.unwrap_or_default(),
            expires_at: issued_at + Duration::seconds(response.expires_in.max(0)),
            scope,
        }
    }

    /// Completa campos que o provedor não reenviou num refresh
    pub fn inherit_missing(mut self, previous: &TokenRecord) -> Self {
        if self.refresh_token.is_empty() {
            self.refresh_token = previous.refresh_token.clone();
        }
        if self.scope.is_empty() {
            self.scope = previous.scope.clone();
        }
        self
    }

    /// True se expira dentro da margem de segurança (ou já expirou)
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin <= now
    }

    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &format!("{}...", truncate_safe(&self.access_token, 8)))
            .field("refresh_token", &if self.refresh_token.is_empty() { "<none>" } else { "<redacted>" })
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(refresh: Option<&str>, scope: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "access-abcdefghijkl".to_string(),
            refresh_token: refresh.map(String::from),
            expires_in: 3600,
            scope: scope.map(String::from),
        }
    }

    #[test]
    fn test_expires_at_is_absolute() {
        let issued_at = Utc::now();
        let record = TokenRecord::from_response(response(Some("r1"), Some("read:jira-work offline_access")), issued_at);

        assert_eq!(record.expires_at, issued_at + Duration::seconds(3600));
        assert!(record.scope.contains("offline_access"));
        assert_eq!(record.scope.len(), 2);
    }

    #[test]
    fn test_needs_refresh_respects_margin() {
        let now = Utc::now();
        let mut record = TokenRecord::from_response(response(Some("r1"), None), now);
        let margin = Duration::seconds(60);

        assert!(!record.needs_refresh(now, margin));

        record.expires_at = now + Duration::seconds(30);
        assert!(record.needs_refresh(now, margin));

        record.expires_at = now - Duration::seconds(5);
        assert!(record.needs_refresh(now, margin));
    }

    #[test]
    fn test_inherit_missing_fields() {
        let now = Utc::now();
        let previous = TokenRecord::from_response(response(Some("r1"), Some("offline_access")), now);
        let refreshed = TokenRecord::from_response(response(None, None), now).inherit_missing(&previous);

        assert_eq!(refreshed.refresh_token, "r1");
        assert!(refreshed.scope.contains("offline_access"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let record = TokenRecord::from_response(response(Some("very-secret-refresh"), None), Utc::now());
        let debug = format!("{:?}", record);
        assert!(!debug.contains("very-secret-refresh"));
        assert!(!debug.contains("access-abcdefghijkl"));
    }
}
