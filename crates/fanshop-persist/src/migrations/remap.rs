use bson::{doc, Document};
use mongodb::Database;
use serde::Serialize;

use crate::dbs::mongo::models::{CHAT_MESSAGES, CONVERSATIONS, ORDERS, OTHER_COSTS};
use crate::error::Result;

/// Documents rewritten by [`remap_ad_group_id`], per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemapReport {
    pub messages: u64,
    pub conversations: u64,
    pub orders: u64,
    pub costs: u64,
}

impl RemapReport {
    pub fn total(&self) -> u64 {
        self.messages + self.conversations + self.orders + self.costs
    }
}

/// Point every reference to ad group `from` at `to`.
///
/// Only documents still carrying `from` are touched, so a second run
/// reports zero changes.
pub async fn remap_ad_group_id(db: &Database, from: &str, to: &str) -> Result<RemapReport> {
    if from == to {
        return Ok(RemapReport::default());
    }

    let remap = |collection: &'static str, field: &'static str| {
        let collection = db.collection::<Document>(collection);
        let mut filter = Document::new();
        filter.insert(field, from);
        let mut set = Document::new();
        set.insert(field, to);
        async move {
            let result = collection
                .update_many(filter, doc! { "$set": set })
                .await?;
            Ok::<u64, crate::error::PersistError>(result.modified_count)
        }
    };

    let report = RemapReport {
        messages: remap(CHAT_MESSAGES, "adGroupId").await?,
        conversations: remap(CONVERSATIONS, "lastAdGroupId").await?,
        orders: remap(ORDERS, "adGroupId").await?,
        costs: remap(OTHER_COSTS, "adGroupId").await?,
    };

    tracing::info!(
        from = %from,
        to = %to,
        messages = report.messages,
        conversations = report.conversations,
        orders = report.orders,
        costs = report.costs,
        "Remapped ad group id"
    );
    Ok(report)
}
