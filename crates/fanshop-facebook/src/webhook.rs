use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fanshop_types::MessageDirection;

/// Body of a Messenger webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEntry {
    /// Page id the events belong to
    pub id: String,
    #[serde(default)]
    pub time: i64,
    /// Raw messaging events. Kept untyped so attribution can look at
    /// fields the typed view does not model.
    #[serde(default)]
    pub messaging: Vec<Value>,
}

impl WebhookPayload {
    pub fn is_page(&self) -> bool {
        self.object == "page"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuickReply {
    #[serde(default)]
    pub payload: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMessage {
    pub mid: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub is_echo: bool,
    /// Set on echoes sent through an app; absent when a person typed in the page inbox
    pub app_id: Option<Value>,
    pub quick_reply: Option<QuickReply>,
    #[serde(default)]
    pub attachments: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Postback {
    pub title: Option<String>,
    #[serde(default)]
    pub payload: String,
}

/// Typed view over one `entry[].messaging[]` element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    pub recipient: Participant,
    #[serde(default)]
    pub timestamp: i64,
    pub message: Option<EventMessage>,
    pub postback: Option<Postback>,
}

impl MessagingEvent {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn is_echo(&self) -> bool {
        self.message.as_ref().map_or(false, |m| m.is_echo)
    }

    pub fn direction(&self) -> MessageDirection {
        if self.is_echo() {
            MessageDirection::Out
        } else {
            MessageDirection::In
        }
    }

    /// PSID of the customer side of the thread
    pub fn customer_psid(&self) -> &str {
        if self.is_echo() {
            &self.recipient.id
        } else {
            &self.sender.id
        }
    }

    /// Echo typed by a person in the page inbox rather than sent by an app
    pub fn is_human_echo(&self) -> bool {
        self.message
            .as_ref()
            .map_or(false, |m| m.is_echo && m.app_id.as_ref().map_or(true, Value::is_null))
    }

    /// Text stored for the message: text, quick-reply or postback title, or an
    /// attachment placeholder. `None` for events that carry no message.
    pub fn content(&self) -> Option<String> {
        if let Some(message) = &self.message {
            if let Some(text) = &message.text {
                return Some(text.clone());
            }
            if !message.attachments.is_empty() {
                let kinds: Vec<&str> = message
                    .attachments
                    .iter()
                    .filter_map(|a| a.get("type").and_then(Value::as_str))
                    .collect();
                return Some(format!("[attachment: {}]", kinds.join(", ")));
            }
            if let Some(quick_reply) = &message.quick_reply {
                return Some(quick_reply.payload.clone());
            }
            return None;
        }
        self.postback.as_ref().map(|p| {
            p.title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| p.payload.clone())
        })
    }

    pub fn quick_reply_payload(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.quick_reply.as_ref())
            .map(|q| q.payload.as_str())
            .or_else(|| self.postback.as_ref().map(|p| p.payload.as_str()))
    }

    pub fn provider_message_id(&self) -> Option<String> {
        self.message.as_ref().and_then(|m| m.mid.clone())
    }

    /// Event time, falling back to `fallback` when the timestamp is missing
    pub fn occurred_at(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        if self.timestamp <= 0 {
            return fallback;
        }
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_text() {
        let raw = json!({
            "sender": {"id": "psid-1"},
            "recipient": {"id": "page-1"},
            "timestamp": 1760000000000i64,
            "message": {"mid": "m_1", "text": "Còn hàng không shop?"}
        });
        let event = MessagingEvent::from_value(&raw).unwrap();

        assert_eq!(event.direction(), MessageDirection::In);
        assert_eq!(event.customer_psid(), "psid-1");
        assert_eq!(event.content().as_deref(), Some("Còn hàng không shop?"));
        assert_eq!(event.provider_message_id().as_deref(), Some("m_1"));
        assert_eq!(event.occurred_at(Utc::now()).timestamp_millis(), 1760000000000);
    }

    #[test]
    fn test_echo_direction_and_author() {
        let human = json!({
            "sender": {"id": "page-1"},
            "recipient": {"id": "psid-1"},
            "message": {"mid": "m_2", "text": "Dạ còn ạ", "is_echo": true}
        });
        let event = MessagingEvent::from_value(&human).unwrap();
        assert_eq!(event.direction(), MessageDirection::Out);
        assert_eq!(event.customer_psid(), "psid-1");
        assert!(event.is_human_echo());

        let app = json!({
            "sender": {"id": "page-1"},
            "recipient": {"id": "psid-1"},
            "message": {"mid": "m_3", "text": "Auto reply", "is_echo": true, "app_id": 1234567}
        });
        let event = MessagingEvent::from_value(&app).unwrap();
        assert!(!event.is_human_echo());
    }

    #[test]
    fn test_postback_and_attachment_content() {
        let postback = json!({
            "sender": {"id": "psid-1"},
            "recipient": {"id": "page-1"},
            "postback": {"title": "Get Started", "payload": "GET_STARTED"}
        });
        let event = MessagingEvent::from_value(&postback).unwrap();
        assert_eq!(event.content().as_deref(), Some("Get Started"));
        assert_eq!(event.quick_reply_payload(), Some("GET_STARTED"));

        let image = json!({
            "sender": {"id": "psid-1"},
            "recipient": {"id": "page-1"},
            "message": {"mid": "m_4", "attachments": [{"type": "image", "payload": {"url": "x"}}]}
        });
        let event = MessagingEvent::from_value(&image).unwrap();
        assert_eq!(event.content().as_deref(), Some("[attachment: image]"));
    }

    #[test]
    fn test_read_receipt_has_no_content() {
        let read = json!({
            "sender": {"id": "psid-1"},
            "recipient": {"id": "page-1"},
            "read": {"watermark": 1}
        });
        let event = MessagingEvent::from_value(&read).unwrap();
        assert!(event.content().is_none());
    }
}
