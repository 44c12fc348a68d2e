use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime, Document};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use crate::dbs::mongo::is_duplicate_key;
use crate::dbs::mongo::models::{MongoChatMessage, MongoConversation, CHAT_MESSAGES, CONVERSATIONS};
use crate::error::{PersistError, Result};
use crate::trait_client::{ConversationFilter, ConversationStore, ConversationTouch, MessageStore};
use fanshop_types::{new_id, ChatMessage, Conversation, ConversationState, MessageDirection};

#[derive(Clone)]
pub struct MongoConversationRepository {
    collection: Collection<MongoConversation>,
}

impl MongoConversationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(CONVERSATIONS),
        }
    }

    async fn upsert_counters(
        &self,
        touch: &ConversationTouch,
        counted: bool,
    ) -> Result<Option<MongoConversation>> {
        let at = BsonDateTime::from_chrono(touch.at);
        let counter = match touch.direction {
            MessageDirection::In => "inboundCount",
            MessageDirection::Out => "outboundCount",
        };

        // Uncounted touches still create the counters so the document is complete
        let step = if counted { 1_i64 } else { 0_i64 };
        let mut inc = doc! { "totalMessages": step, "inboundCount": 0_i64, "outboundCount": 0_i64 };
        inc.insert(counter, step);
        let mut set = doc! { "updatedAt": at };
        if counted {
            set.insert("lastMessageAt", at);
        }
        if let Some(ad_group_id) = &touch.ad_group_id {
            set.insert("lastAdGroupId", ad_group_id.as_str());
        }

        let update = doc! {
            "$inc": inc,
            "$set": set,
            "$setOnInsert": {
                "_id": new_id(),
                "state": touch.initial_state.as_str(),
                "createdAt": at,
            },
        };

        Ok(self
            .collection
            .find_one_and_update(
                doc! { "fanpageId": touch.fanpage_id.as_str(), "senderPsid": touch.sender_psid.as_str() },
                update,
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn upsert(&self, touch: &ConversationTouch, counted: bool) -> Result<Conversation> {
        let updated = match self.upsert_counters(touch, counted).await {
            // Two first messages raced on the unique pair index; the loser
            // now finds the winner's document and increments it
            Err(PersistError::Database(e)) if is_duplicate_key(&e) => {
                tracing::debug!(
                    fanpage_id = %touch.fanpage_id,
                    sender_psid = %touch.sender_psid,
                    "Conversation upsert raced, retrying"
                );
                self.upsert_counters(touch, counted).await?
            }
            other => other?,
        };

        updated.map(Conversation::from).ok_or_else(|| {
            PersistError::Internal(format!(
                "upsert returned no conversation for {}/{}",
                touch.fanpage_id, touch.sender_psid
            ))
        })
    }
}

#[async_trait]
impl ConversationStore for MongoConversationRepository {
    async fn record_message(&self, touch: &ConversationTouch) -> Result<Conversation> {
        self.upsert(touch, true).await
    }

    async fn record_referral(&self, touch: &ConversationTouch) -> Result<Conversation> {
        self.upsert(touch, false).await
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        let found = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(found.map(Conversation::from))
    }

    async fn find_by_pair(&self, fanpage_id: &str, sender_psid: &str) -> Result<Option<Conversation>> {
        let found = self
            .collection
            .find_one(doc! { "fanpageId": fanpage_id, "senderPsid": sender_psid })
            .await?;
        Ok(found.map(Conversation::from))
    }

    async fn list(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>> {
        let mut query = Document::new();
        if let Some(fanpage_id) = &filter.fanpage_id {
            query.insert("fanpageId", fanpage_id.as_str());
        }
        if let Some(state) = filter.state {
            query.insert("state", state.as_str());
        }

        let mut find = self
            .collection
            .find(query)
            .sort(doc! { "lastMessageAt": -1, "_id": 1 });
        if let Some(limit) = filter.limit {
            find = find.limit(limit);
        }

        let conversations: Vec<MongoConversation> = find.await?.try_collect().await?;
        Ok(conversations.into_iter().map(Conversation::from).collect())
    }

    async fn compare_and_set_state(
        &self,
        id: &str,
        expected: ConversationState,
        next: ConversationState,
    ) -> Result<Option<Conversation>> {
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "_id": id, "state": expected.as_str() },
                doc! { "$set": { "state": next.as_str(), "updatedAt": BsonDateTime::now() } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(Conversation::from))
    }
}

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoChatMessage>,
}

impl MongoMessageRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(CHAT_MESSAGES),
        }
    }
}

#[async_trait]
impl MessageStore for MongoMessageRepository {
    async fn insert(&self, message: ChatMessage) -> Result<ChatMessage> {
        let document = MongoChatMessage::from(message.clone());
        self.collection.insert_one(&document).await?;
        Ok(message)
    }

    async fn list_for_pair(
        &self,
        fanpage_id: &str,
        sender_psid: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>> {
        let latest: Vec<MongoChatMessage> = self
            .collection
            .find(doc! { "fanpageId": fanpage_id, "senderPsid": sender_psid })
            .sort(doc! { "receivedAt": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(latest.into_iter().rev().map(ChatMessage::from).collect())
    }

    async fn list_in_range(
        &self,
        fanpage_id: Option<&str>,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ChatMessage>> {
        let mut filter = doc! {
            "receivedAt": {
                "$gte": BsonDateTime::from_chrono(start),
                "$lt": BsonDateTime::from_chrono(end),
            }
        };
        if let Some(fanpage_id) = fanpage_id {
            filter.insert("fanpageId", fanpage_id);
        }

        let messages: Vec<MongoChatMessage> = self
            .collection
            .find(filter)
            .sort(doc! { "receivedAt": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages.into_iter().map(ChatMessage::from).collect())
    }

    async fn clear_awaiting_human(&self, fanpage_id: &str, sender_psid: &str) -> Result<u64> {
        let result = self
            .collection
            .update_many(
                doc! { "fanpageId": fanpage_id, "senderPsid": sender_psid, "awaitingHuman": true },
                doc! { "$set": { "awaitingHuman": false } },
            )
            .await?;
        Ok(result.modified_count)
    }
}
