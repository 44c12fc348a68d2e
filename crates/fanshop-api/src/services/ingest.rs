//! Messenger webhook ingestion: attribution, conversation counters, handoff
//! and message storage, one event at a time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ApiResult;
use crate::services::handoff;
use fanshop_facebook::{extract_ad_group_id, MessagingEvent, WebhookPayload};
use fanshop_persist::{ConversationTouch, Persistence};
use fanshop_types::{
    new_id, ChatMessage, ConversationState, Fanpage, HandoffEvent, MessageDirection,
};

/// Quick-reply or postback payload that asks for a person
const HUMAN_PAYLOAD: &str = "HUMAN";

/// A messaging event reduced to what gets stored
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    /// Provider page id from `entry[].id`
    pub page_id: String,
    pub customer_psid: String,
    pub direction: MessageDirection,
    /// `None` for a standalone referral, which only carries attribution
    pub content: Option<String>,
    pub ad_group_id: Option<String>,
    pub provider_message_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub handoff: Option<HandoffEvent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub stored: usize,
    /// Referrals that only stamped a conversation's ad group
    pub referrals: usize,
    /// Events for pages that are not connected
    pub skipped: usize,
    pub failed: usize,
}

/// Handoff event implied by a messaging event, if any
pub fn handoff_event(event: &MessagingEvent, keywords: &[String]) -> Option<HandoffEvent> {
    if event.is_echo() {
        return event.is_human_echo().then_some(HandoffEvent::AgentReplied);
    }

    if event
        .quick_reply_payload()
        .is_some_and(|p| p.trim().eq_ignore_ascii_case(HUMAN_PAYLOAD))
    {
        return Some(HandoffEvent::CustomerRequestedHuman);
    }

    let text = event.message.as_ref()?.text.as_deref()?.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .any(|k| !k.is_empty() && text.contains(&k))
        .then_some(HandoffEvent::CustomerRequestedHuman)
}

/// Flatten a delivery into storable messages. Events without a text,
/// attachment, quick reply or postback (reads, deliveries) are dropped
/// unless they carry an ad-group referral.
pub fn collect_messages(
    payload: &WebhookPayload,
    keywords: &[String],
    received_at: DateTime<Utc>,
) -> Vec<IncomingMessage> {
    let mut messages = Vec::new();

    for entry in &payload.entry {
        for raw in &entry.messaging {
            let Some(event) = MessagingEvent::from_value(raw) else {
                tracing::warn!(page_id = %entry.id, "Unparseable messaging event skipped");
                continue;
            };
            let content = event.content();
            let ad_group_id = extract_ad_group_id(raw);
            if content.is_none() && ad_group_id.is_none() {
                continue;
            }

            messages.push(IncomingMessage {
                page_id: entry.id.clone(),
                customer_psid: event.customer_psid().to_string(),
                direction: event.direction(),
                handoff: content.as_ref().and_then(|_| handoff_event(&event, keywords)),
                content,
                ad_group_id,
                provider_message_id: event.provider_message_id(),
                occurred_at: event.occurred_at(received_at),
            });
        }
    }

    messages
}

/// Store every message of a delivery. Failures are logged per message and
/// never abort the rest of the batch.
pub async fn ingest(persist: &dyn Persistence, messages: Vec<IncomingMessage>) -> IngestReport {
    let mut report = IngestReport::default();
    let mut fanpages: HashMap<String, Option<Fanpage>> = HashMap::new();

    for message in messages {
        let fanpage = match fanpages.get(&message.page_id) {
            Some(cached) => cached.clone(),
            None => match persist.fanpages().find_by_page_id(&message.page_id).await {
                Ok(found) => {
                    fanpages.insert(message.page_id.clone(), found.clone());
                    found
                }
                Err(e) => {
                    tracing::error!(page_id = %message.page_id, error = %e, "Fanpage lookup failed");
                    report.failed += 1;
                    continue;
                }
            },
        };

        let Some(fanpage) = fanpage else {
            tracing::warn!(page_id = %message.page_id, "Webhook event for unknown fanpage skipped");
            report.skipped += 1;
            continue;
        };

        let referral_only = message.content.is_none();
        let outcome = if referral_only {
            store_referral(persist, &fanpage, &message).await
        } else {
            store_message(persist, &fanpage, &message).await
        };
        match outcome {
            Ok(()) if referral_only => report.referrals += 1,
            Ok(()) => report.stored += 1,
            Err(e) => {
                tracing::error!(
                    fanpage_id = %fanpage.id,
                    sender_psid = %message.customer_psid,
                    error = %e,
                    "Failed to ingest message"
                );
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        stored = report.stored,
        referrals = report.referrals,
        skipped = report.skipped,
        failed = report.failed,
        "Webhook delivery processed"
    );
    report
}

fn conversation_touch(fanpage: &Fanpage, message: &IncomingMessage) -> ConversationTouch {
    ConversationTouch {
        fanpage_id: fanpage.id.clone(),
        sender_psid: message.customer_psid.clone(),
        direction: message.direction,
        ad_group_id: message.ad_group_id.clone(),
        at: message.occurred_at,
        initial_state: ConversationState::initial(fanpage.auto_ai_default),
    }
}

async fn store_referral(
    persist: &dyn Persistence,
    fanpage: &Fanpage,
    message: &IncomingMessage,
) -> ApiResult<()> {
    let conversation = persist
        .conversations()
        .record_referral(&conversation_touch(fanpage, message))
        .await?;
    tracing::debug!(
        conversation_id = %conversation.id,
        ad_group_id = ?message.ad_group_id,
        "Referral attributed"
    );
    Ok(())
}

async fn store_message(
    persist: &dyn Persistence,
    fanpage: &Fanpage,
    message: &IncomingMessage,
) -> ApiResult<()> {
    let touch = conversation_touch(fanpage, message);
    let mut conversation = persist.conversations().record_message(&touch).await?;

    if let Some(event) = message.handoff {
        conversation = handoff::apply_event(persist, conversation, event).await?;
    }

    persist
        .messages()
        .insert(ChatMessage {
            id: new_id(),
            fanpage_id: fanpage.id.clone(),
            sender_psid: message.customer_psid.clone(),
            direction: message.direction,
            content: message.content.clone().unwrap_or_default(),
            ad_group_id: message.ad_group_id.clone(),
            awaiting_human: conversation.state == ConversationState::AwaitingHuman,
            provider_message_id: message.provider_message_id.clone(),
            received_at: message.occurred_at,
        })
        .await?;

    tracing::debug!(
        conversation_id = %conversation.id,
        direction = message.direction.as_str(),
        ad_group_id = ?message.ad_group_id,
        state = conversation.state.as_str(),
        "Message stored"
    );
    Ok(())
}
