use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};

use super::{duplicate_defaults, Migration};
use crate::dbs::mongo::models::{
    CHAT_MESSAGES, CONVERSATIONS, FANPAGES, OPENAI_CONFIGS, ORDERS, OTHER_COSTS,
};
use crate::error::Result;
use fanshop_types::ConversationState;

pub fn builtin_migrations() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(CreateIndexes),
        Box::new(ConversationStateFromFlags),
        Box::new(BackfillLastAdGroup),
        Box::new(SingleDefaultConfig),
        Box::new(UniqueDefaultConfig),
    ]
}

fn raw(db: &Database, name: &str) -> Collection<Document> {
    db.collection(name)
}

fn index(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// At most one `isDefault: true` config per `fanpageId` scope
fn default_config_index() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "fanpageId": 1, "isDefault": 1 })
        .options(
            IndexOptions::builder()
                .name(DEFAULT_CONFIG_INDEX.to_string())
                .unique(true)
                .partial_filter_expression(doc! { "isDefault": true })
                .build(),
        )
        .build()
}

const DEFAULT_CONFIG_INDEX: &str = "fanpageId_1_isDefault_1_unique_default";

pub struct CreateIndexes;

#[async_trait]
impl Migration for CreateIndexes {
    fn version(&self) -> u32 {
        1
    }

    fn name(&self) -> &'static str {
        "create_indexes"
    }

    async fn up(&self, db: &Database) -> Result<()> {
        let plan = [
            (CONVERSATIONS, unique_index(doc! { "fanpageId": 1, "senderPsid": 1 })),
            (CONVERSATIONS, index(doc! { "state": 1, "lastMessageAt": -1 })),
            (CHAT_MESSAGES, index(doc! { "fanpageId": 1, "senderPsid": 1, "receivedAt": 1 })),
            (CHAT_MESSAGES, index(doc! { "receivedAt": 1 })),
            (CHAT_MESSAGES, index(doc! { "adGroupId": 1 })),
            (ORDERS, index(doc! { "orderDate": 1 })),
            (ORDERS, index(doc! { "adGroupId": 1 })),
            (OTHER_COSTS, index(doc! { "date": 1 })),
            (FANPAGES, unique_index(doc! { "pageId": 1 })),
        ];

        for (collection, model) in plan {
            raw(db, collection).create_index(model).await?;
        }
        tracing::info!("Created collection indexes");
        Ok(())
    }
}

/// Replaces the `needsHuman` / `autoAiEnabled` pair with a single `state`
pub struct ConversationStateFromFlags;

#[async_trait]
impl Migration for ConversationStateFromFlags {
    fn version(&self) -> u32 {
        2
    }

    fn name(&self) -> &'static str {
        "conversation_state_from_flags"
    }

    async fn up(&self, db: &Database) -> Result<()> {
        let conversations = raw(db, CONVERSATIONS);

        // Most specific first: needsHuman wins over a disabled auto reply
        let steps = [
            (
                doc! { "state": { "$exists": false }, "needsHuman": true },
                ConversationState::from_legacy_flags(true, true),
            ),
            (
                doc! { "state": { "$exists": false }, "autoAiEnabled": false },
                ConversationState::from_legacy_flags(false, false),
            ),
            (
                doc! { "state": { "$exists": false } },
                ConversationState::from_legacy_flags(false, true),
            ),
        ];

        for (filter, state) in steps {
            let result = conversations
                .update_many(filter, doc! { "$set": { "state": state.as_str() } })
                .await?;
            tracing::info!(state = state.as_str(), converted = result.modified_count, "Converted legacy conversations");
        }

        conversations
            .update_many(
                doc! { "$or": [
                    { "needsHuman": { "$exists": true } },
                    { "autoAiEnabled": { "$exists": true } },
                ] },
                doc! { "$unset": { "needsHuman": "", "autoAiEnabled": "" } },
            )
            .await?;
        Ok(())
    }
}

/// Fills `lastAdGroupId` from each conversation's latest attributed message
pub struct BackfillLastAdGroup;

#[async_trait]
impl Migration for BackfillLastAdGroup {
    fn version(&self) -> u32 {
        3
    }

    fn name(&self) -> &'static str {
        "backfill_last_ad_group"
    }

    async fn up(&self, db: &Database) -> Result<()> {
        let pipeline = vec![
            doc! { "$match": { "adGroupId": { "$type": "string" } } },
            doc! { "$sort": { "receivedAt": -1 } },
            doc! { "$group": {
                "_id": { "fanpageId": "$fanpageId", "senderPsid": "$senderPsid" },
                "adGroupId": { "$first": "$adGroupId" },
            } },
        ];

        let conversations = raw(db, CONVERSATIONS);
        let mut latest = raw(db, CHAT_MESSAGES).aggregate(pipeline).await?;
        let mut filled = 0u64;

        while let Some(row) = latest.try_next().await? {
            let (Ok(pair), Ok(ad_group_id)) = (row.get_document("_id"), row.get_str("adGroupId")) else {
                continue;
            };
            let (Ok(fanpage_id), Ok(sender_psid)) = (pair.get_str("fanpageId"), pair.get_str("senderPsid")) else {
                continue;
            };

            // `null` matches both a missing and an explicitly empty field
            let result = conversations
                .update_one(
                    doc! { "fanpageId": fanpage_id, "senderPsid": sender_psid, "lastAdGroupId": null },
                    doc! { "$set": { "lastAdGroupId": ad_group_id } },
                )
                .await?;
            filled += result.modified_count;
        }

        tracing::info!(filled, "Backfilled conversation ad groups");
        Ok(())
    }
}

/// Keeps only the most recently updated default config in each scope
pub struct SingleDefaultConfig;

#[async_trait]
impl Migration for SingleDefaultConfig {
    fn version(&self) -> u32 {
        4
    }

    fn name(&self) -> &'static str {
        "single_default_openai_config"
    }

    async fn up(&self, db: &Database) -> Result<()> {
        let configs = raw(db, OPENAI_CONFIGS);
        let defaults: Vec<Document> = configs
            .find(doc! { "isDefault": true })
            .sort(doc! { "updatedAt": -1, "_id": 1 })
            .projection(doc! { "_id": 1, "fanpageId": 1 })
            .await?
            .try_collect()
            .await?;

        let pairs: Vec<(String, Option<String>)> = defaults
            .iter()
            .filter_map(|d| {
                let id = d.get_str("_id").ok()?.to_string();
                let scope = d.get_str("fanpageId").ok().map(str::to_string);
                Some((id, scope))
            })
            .collect();

        let duplicates = duplicate_defaults(&pairs);
        if duplicates.is_empty() {
            return Ok(());
        }

        let result = configs
            .update_many(
                doc! { "_id": { "$in": duplicates } },
                doc! { "$set": { "isDefault": false } },
            )
            .await?;
        tracing::warn!(cleared = result.modified_count, "Cleared duplicate default OpenAI configs");
        Ok(())
    }
}

/// Enforces the single default per scope in the database once duplicates
/// have been cleared by version 4
pub struct UniqueDefaultConfig;

#[async_trait]
impl Migration for UniqueDefaultConfig {
    fn version(&self) -> u32 {
        5
    }

    fn name(&self) -> &'static str {
        "unique_default_openai_config"
    }

    async fn up(&self, db: &Database) -> Result<()> {
        raw(db, OPENAI_CONFIGS).create_index(default_config_index()).await?;
        tracing::info!("Created unique default OpenAI config index");
        Ok(())
    }
}
