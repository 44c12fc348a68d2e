use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fanshop_types::TokenStatus;

/// Graph error code for an expired or logged-out session
const CODE_SESSION_EXPIRED: i64 = 190;
const CODE_API_SESSION: i64 = 102;
const CODE_ACTIVE_TOKEN_REQUIRED: i64 = 2500;

/// Outcome of checking one access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCheck {
    pub status: TokenStatus,
    pub message: String,
    /// Granted permissions, only filled for valid tokens
    pub scopes: Vec<String>,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl TokenCheck {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::failed(TokenStatus::Invalid, message)
    }

    pub fn failed(status: TokenStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            scopes: Vec::new(),
            account_id: None,
            account_name: None,
            checked_at: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == TokenStatus::Valid
    }
}

/// Checks tokens against the provider. Implementations never fail: every
/// problem is reported through [`TokenCheck::status`].
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> TokenCheck;
}

/// Map a Graph API error code to a token status
pub fn classify_provider_error(code: i64) -> TokenStatus {
    match code {
        CODE_SESSION_EXPIRED => TokenStatus::Expired,
        CODE_API_SESSION | CODE_ACTIVE_TOKEN_REQUIRED => TokenStatus::Invalid,
        // Permission and throttling errors also mean the token cannot be used
        _ => TokenStatus::Invalid,
    }
}

/// `{"error": {...}}` envelope returned by the Graph API
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphErrorEnvelope {
    pub error: GraphError,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
    pub error_subcode: Option<i64>,
}

impl GraphError {
    pub fn to_check(&self) -> TokenCheck {
        let status = classify_provider_error(self.code);
        let label = match status {
            TokenStatus::Expired => "Token expired",
            _ => "Token invalid",
        };
        let message = match self.error_subcode {
            Some(sub) => format!("{} (code {}, subcode {}): {}", label, self.code, sub, self.message),
            None => format!("{} (code {}): {}", label, self.code, self.message),
        };
        TokenCheck::failed(status, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_codes() {
        assert_eq!(classify_provider_error(190), TokenStatus::Expired);
        assert_eq!(classify_provider_error(102), TokenStatus::Invalid);
        assert_eq!(classify_provider_error(2500), TokenStatus::Invalid);
        assert_eq!(classify_provider_error(4), TokenStatus::Invalid);
    }

    #[test]
    fn test_error_message() {
        let err = GraphError {
            message: "Session has expired".to_string(),
            code: 190,
            error_subcode: Some(463),
        };
        let check = err.to_check();
        assert_eq!(check.status, TokenStatus::Expired);
        assert!(check.message.contains("subcode 463"));
        assert!(check.scopes.is_empty());
    }
}
