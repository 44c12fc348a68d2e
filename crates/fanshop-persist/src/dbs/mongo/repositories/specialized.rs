use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime, Document};
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::options::ReturnDocument;

use super::MongoRepository;
use crate::dbs::mongo::models::{
    MongoAdGroup, MongoApiToken, MongoDocument, MongoFanpage, MongoOpenAIConfig, MongoOrder,
    MongoOtherCost,
};
use crate::dbs::mongo::is_duplicate_key;
use crate::error::{PersistError, Result};
use crate::trait_client::{
    AdGroupStore, ApiTokenStore, CostStore, FanpageStore, OpenAIConfigStore, OrderStore,
    RecordStore, TokenStatusUpdate,
};
use fanshop_types::{AdGroup, ApiToken, Fanpage, OpenAIConfig, Order, OtherCost};

/// Clear-then-set rounds before `set_default` reports a conflict
const SET_DEFAULT_ATTEMPTS: usize = 3;

#[async_trait]
impl FanpageStore for MongoRepository<MongoFanpage> {
    async fn find_by_page_id(&self, page_id: &str) -> Result<Option<Fanpage>> {
        self.find_record(doc! { "pageId": page_id }).await
    }
}

#[async_trait]
impl AdGroupStore for MongoRepository<MongoAdGroup> {
    async fn get_many(&self, ids: &[String]) -> Result<Vec<AdGroup>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_records(doc! { "_id": { "$in": ids.to_vec() } }, doc! { "_id": 1 })
            .await
    }
}

#[async_trait]
impl OrderStore for MongoRepository<MongoOrder> {
    async fn find_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Order>> {
        let filter = doc! {
            "orderDate": {
                "$gte": BsonDateTime::from_chrono(start),
                "$lt": BsonDateTime::from_chrono(end),
            }
        };
        self.find_records(filter, doc! { "orderDate": 1 }).await
    }
}

#[async_trait]
impl CostStore for MongoRepository<MongoOtherCost> {
    async fn find_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<OtherCost>> {
        let filter = doc! {
            "date": { "$gte": start.to_string(), "$lte": end.to_string() }
        };
        self.find_records(filter, doc! { "date": 1 }).await
    }
}

#[async_trait]
impl OpenAIConfigStore for MongoRepository<MongoOpenAIConfig> {
    async fn set_default(&self, id: &str) -> Result<Option<OpenAIConfig>> {
        let Some(target) = self.get(id).await? else {
            return Ok(None);
        };

        // The partial unique index on (fanpageId, isDefault: true) rejects the
        // final write when a concurrent call set another default in between
        for attempt in 1..=SET_DEFAULT_ATTEMPTS {
            let now = BsonDateTime::now();
            self.collection()
                .update_many(
                    doc! {
                        "fanpageId": target.fanpage_id.clone(),
                        "_id": { "$ne": id },
                        "isDefault": true,
                    },
                    doc! { "$set": { "isDefault": false, "updatedAt": now } },
                )
                .await?;

            let updated = self
                .collection()
                .find_one_and_update(
                    doc! { "_id": id },
                    doc! { "$set": { "isDefault": true, "updatedAt": now } },
                )
                .return_document(ReturnDocument::After)
                .await;

            match updated {
                Ok(updated) => {
                    tracing::info!(
                        config_id = %id,
                        scope = target.fanpage_id.as_deref().unwrap_or("global"),
                        "Set default OpenAI config"
                    );
                    return Ok(updated.map(MongoOpenAIConfig::into_record));
                }
                Err(e) if is_duplicate_key(&e) => {
                    tracing::debug!(config_id = %id, attempt, "Default changed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PersistError::Duplicate {
            kind: "default OpenAI config",
            id: id.to_string(),
        })
    }
}

fn status_fields(update: &TokenStatusUpdate) -> Document {
    let checked_at = BsonDateTime::from_chrono(update.checked_at);
    doc! {
        "status": update.status.as_str(),
        "statusMessage": update.message.clone(),
        "scopes": update.scopes.clone(),
        "lastCheckedAt": checked_at,
        "updatedAt": checked_at,
    }
}

#[async_trait]
impl ApiTokenStore for MongoRepository<MongoApiToken> {
    async fn update_status(&self, id: &str, update: &TokenStatusUpdate) -> Result<Option<ApiToken>> {
        let updated = self
            .collection()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": status_fields(update) })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(MongoApiToken::into_record))
    }

    async fn rotate(
        &self,
        id: &str,
        new_token: &str,
        update: &TokenStatusUpdate,
        notes: Option<String>,
    ) -> Result<Option<ApiToken>> {
        let mut set = status_fields(update);
        set.insert("token", new_token);
        set.insert("rotatedAt", BsonDateTime::from_chrono(update.checked_at));
        if let Some(notes) = notes {
            set.insert("notes", notes);
        }

        let updated = self
            .collection()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(MongoApiToken::into_record))
    }
}
