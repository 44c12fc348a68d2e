use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::trait_client::{ConversationFilter, ConversationStore, ConversationTouch, MessageStore};
use fanshop_types::{new_id, ChatMessage, Conversation, ConversationState, MessageDirection};

#[derive(Default)]
pub struct MemoryConversations {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl MemoryConversations {
    async fn touch(&self, touch: &ConversationTouch, counted: bool) -> Result<Conversation> {
        // The write lock makes find-or-create and the update one step
        let mut conversations = self.conversations.write().await;
        let existing = conversations
            .values()
            .find(|c| c.fanpage_id == touch.fanpage_id && c.sender_psid == touch.sender_psid)
            .map(|c| c.id.clone());

        let id = match existing {
            Some(id) => id,
            None => {
                let conversation = Conversation {
                    id: new_id(),
                    fanpage_id: touch.fanpage_id.clone(),
                    sender_psid: touch.sender_psid.clone(),
                    total_messages: 0,
                    inbound_count: 0,
                    outbound_count: 0,
                    last_ad_group_id: None,
                    last_message_at: None,
                    state: touch.initial_state,
                    created_at: touch.at,
                    updated_at: touch.at,
                };
                let id = conversation.id.clone();
                conversations.insert(id.clone(), conversation);
                id
            }
        };

        let conversation = conversations
            .get_mut(&id)
            .ok_or_else(|| PersistError::not_found("conversation", &id))?;
        if counted {
            conversation.total_messages += 1;
            match touch.direction {
                MessageDirection::In => conversation.inbound_count += 1,
                MessageDirection::Out => conversation.outbound_count += 1,
            }
            conversation.last_message_at = Some(touch.at);
        }
        if touch.ad_group_id.is_some() {
            conversation.last_ad_group_id = touch.ad_group_id.clone();
        }
        conversation.updated_at = touch.at;
        Ok(conversation.clone())
    }
}

#[async_trait]
impl ConversationStore for MemoryConversations {
    async fn record_message(&self, touch: &ConversationTouch) -> Result<Conversation> {
        self.touch(touch, true).await
    }

    async fn record_referral(&self, touch: &ConversationTouch) -> Result<Conversation> {
        self.touch(touch, false).await
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations.read().await.get(id).cloned())
    }

    async fn find_by_pair(&self, fanpage_id: &str, sender_psid: &str) -> Result<Option<Conversation>> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .find(|c| c.fanpage_id == fanpage_id && c.sender_psid == sender_psid)
            .cloned())
    }

    async fn list(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut matching: Vec<Conversation> = conversations
            .values()
            .filter(|c| filter.fanpage_id.as_ref().is_none_or(|f| *f == c.fanpage_id))
            .filter(|c| filter.state.is_none_or(|s| s == c.state))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        if let Some(limit) = filter.limit {
            matching.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(matching)
    }

    async fn compare_and_set_state(
        &self,
        id: &str,
        expected: ConversationState,
        next: ConversationState,
    ) -> Result<Option<Conversation>> {
        let mut conversations = self.conversations.write().await;
        match conversations.get_mut(id) {
            Some(conversation) if conversation.state == expected => {
                conversation.state = next;
                conversation.updated_at = Utc::now();
                Ok(Some(conversation.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct MemoryMessages {
    messages: RwLock<Vec<ChatMessage>>,
}

#[async_trait]
impl MessageStore for MemoryMessages {
    async fn insert(&self, message: ChatMessage) -> Result<ChatMessage> {
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_for_pair(
        &self,
        fanpage_id: &str,
        sender_psid: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.read().await;
        let mut thread: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.fanpage_id == fanpage_id && m.sender_psid == sender_psid)
            .cloned()
            .collect();
        thread.sort_by_key(|m| m.received_at);
        let keep = usize::try_from(limit).unwrap_or(0);
        let skip = thread.len().saturating_sub(keep);
        Ok(thread.split_off(skip))
    }

    async fn list_in_range(
        &self,
        fanpage_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>> {
        let messages = self.messages.read().await;
        let mut selected: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| fanpage_id.is_none_or(|f| f == m.fanpage_id))
            .filter(|m| start <= m.received_at && m.received_at < end)
            .cloned()
            .collect();
        selected.sort_by_key(|m| m.received_at);
        Ok(selected)
    }

    async fn clear_awaiting_human(&self, fanpage_id: &str, sender_psid: &str) -> Result<u64> {
        let mut messages = self.messages.write().await;
        let mut changed = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.awaiting_human && m.fanpage_id == fanpage_id && m.sender_psid == sender_psid)
        {
            message.awaiting_human = false;
            changed += 1;
        }
        Ok(changed)
    }
}
