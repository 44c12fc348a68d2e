use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{is_placeholder_secret, serialize_masked, ActivityStatus};
use crate::record::{require_non_empty, Record, ValidationError};

/// Model parameters for the auto-responder.
///
/// `fanpage_id` is the scope: `None` means the global scope. At most one
/// config per scope has `is_default` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAIConfig {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, serialize_with = "serialize_masked")]
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub fanpage_id: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub status: ActivityStatus,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

fn default_temperature() -> f32 {
    0.7
}

impl Record for OpenAIConfig {
    const KIND: &'static str = "OpenAI config";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn assign_identity(&mut self, id: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("model", &self.model)?;
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::new("temperature", "must be between 0 and 2"));
        }
        Ok(())
    }

    fn keep_server_fields(&mut self, existing: &Self) {
        if is_placeholder_secret(&self.api_key) {
            self.api_key = existing.api_key.clone();
        }
        // Defaults only move through set_default. A config moved to another
        // scope arrives there as a non-default.
        self.is_default = existing.is_default && self.fanpage_id == existing.fanpage_id;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Valid,
    Invalid,
    Expired,
    #[default]
    Unknown,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Valid => "valid",
            TokenStatus::Invalid => "invalid",
            TokenStatus::Expired => "expired",
            TokenStatus::Unknown => "unknown",
        }
    }
}

/// A stored Graph API access token and the result of its last check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fanpage_id: Option<String>,
    #[serde(default, serialize_with = "serialize_masked")]
    pub token: String,
    #[serde(default)]
    pub status: TokenStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rotated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Record for ApiToken {
    const KIND: &'static str = "API token";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn assign_identity(&mut self, id: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("token", &self.token)
    }

    fn keep_server_fields(&mut self, existing: &Self) {
        // The token itself changes through rotation, status through validation
        self.token = existing.token.clone();
        self.status = existing.status;
        self.status_message = existing.status_message.clone();
        self.scopes = existing.scopes.clone();
        self.last_checked_at = existing.last_checked_at;
        self.rotated_at = existing.rotated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_masked_in_json() {
        let token: ApiToken = serde_json::from_str(
            r#"{"name": "main page", "token": "EAABverysecrettoken9876"}"#,
        )
        .unwrap();
        assert_eq!(token.status, TokenStatus::Unknown);

        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token"], "EAAB…9876");
        assert_eq!(json["status"], "unknown");
    }

    #[test]
    fn test_update_keeps_managed_fields() {
        let mut existing: ApiToken =
            serde_json::from_str(r#"{"name": "a", "token": "EAABverysecrettoken9876"}"#).unwrap();
        existing.status = TokenStatus::Valid;
        existing.scopes = vec!["pages_messaging".to_string()];

        let mut incoming: ApiToken =
            serde_json::from_str(r#"{"name": "renamed", "token": "EAAB…9876"}"#).unwrap();
        incoming.keep_server_fields(&existing);

        assert_eq!(incoming.name, "renamed");
        assert_eq!(incoming.token, "EAABverysecrettoken9876");
        assert_eq!(incoming.status, TokenStatus::Valid);
        assert_eq!(incoming.scopes.len(), 1);
    }

    #[test]
    fn test_openai_config_keeps_key_and_default_flag() {
        let mut existing: OpenAIConfig = serde_json::from_str(
            r#"{"name": "gpt", "apiKey": "sk-abcdefghijklmnop", "model": "gpt-4o-mini"}"#,
        )
        .unwrap();
        existing.is_default = true;

        let mut incoming: OpenAIConfig = serde_json::from_str(
            r#"{"name": "gpt", "apiKey": "sk-a…mnop", "model": "gpt-4o", "isDefault": false}"#,
        )
        .unwrap();
        incoming.keep_server_fields(&existing);

        assert_eq!(incoming.api_key, "sk-abcdefghijklmnop");
        assert!(incoming.is_default);
        assert_eq!(incoming.model, "gpt-4o");
    }

    #[test]
    fn test_openai_config_moved_to_another_scope_loses_default() {
        let mut existing: OpenAIConfig = serde_json::from_str(
            r#"{"name": "gpt", "apiKey": "sk-abcdefghijklmnop", "model": "gpt-4o-mini"}"#,
        )
        .unwrap();
        existing.is_default = true;

        let mut incoming: OpenAIConfig = serde_json::from_str(
            r#"{"name": "gpt", "apiKey": "sk-a…mnop", "model": "gpt-4o-mini", "fanpageId": "fp1"}"#,
        )
        .unwrap();
        incoming.keep_server_fields(&existing);

        assert_eq!(incoming.fanpage_id.as_deref(), Some("fp1"));
        assert!(!incoming.is_default);
    }
}
