use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{is_placeholder_secret, serialize_masked, ActivityStatus};
use crate::record::{require_non_empty, Record, ValidationError};
use crate::state::ConversationState;

/// A connected Messenger page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fanpage {
    #[serde(default)]
    pub id: String,
    /// Provider page id, as seen in webhook `entry[].id`
    pub page_id: String,
    pub name: String,
    #[serde(default, serialize_with = "serialize_masked")]
    pub access_token: String,
    #[serde(default)]
    pub status: ActivityStatus,
    #[serde(default, rename = "openAIConfigId")]
    pub openai_config_id: Option<String>,
    /// State new conversations start in: AI when true, human otherwise
    #[serde(default = "default_true")]
    pub auto_ai_default: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Record for Fanpage {
    const KIND: &'static str = "fanpage";

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
        require_non_empty("pageId", &self.page_id)?;
        require_non_empty("name", &self.name)
    }

    fn keep_server_fields(&mut self, existing: &Self) {
        if is_placeholder_secret(&self.access_token) {
            self.access_token = existing.access_token.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    In,
    Out,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::In => "in",
            MessageDirection::Out => "out",
        }
    }
}

/// One stored Messenger message. Only `awaiting_human` changes after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub fanpage_id: String,
    pub sender_psid: String,
    pub direction: MessageDirection,
    pub content: String,
    pub ad_group_id: Option<String>,
    pub awaiting_human: bool,
    pub provider_message_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Aggregate state of the thread between a fanpage and one sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub fanpage_id: String,
    pub sender_psid: String,
    pub total_messages: i64,
    pub inbound_count: i64,
    pub outbound_count: i64,
    pub last_ad_group_id: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn needs_human(&self) -> bool {
        self.state.needs_human()
    }

    pub fn auto_ai_enabled(&self) -> bool {
        self.state.auto_ai_enabled()
    }
}
