use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::trait_client::{
    AdGroupStore, ApiTokenStore, CostStore, FanpageStore, OpenAIConfigStore, OrderStore, Page,
    RecordStore, TokenStatusUpdate,
};
use fanshop_types::{AdGroup, ApiToken, Fanpage, OpenAIConfig, Order, OtherCost, Record};

/// A collection of records held in process memory
pub struct MemoryCollection<T: Record> {
    records: RwLock<HashMap<String, T>>,
}

impl<T: Record> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Record> MemoryCollection<T> {
    /// Snapshot of every record matching `predicate`, newest first
    async fn select(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let records = self.records.read().await;
        let mut selected: Vec<T> = records.values().filter(|r| predicate(*r)).cloned().collect();
        selected.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        selected
    }

    /// Apply `change` to the record with `id` and return the updated copy
    async fn modify(&self, id: &str, change: impl FnOnce(&mut T)) -> Option<T> {
        let mut records = self.records.write().await;
        let record = records.get_mut(id)?;
        change(record);
        Some(record.clone())
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for MemoryCollection<T> {
    async fn insert(&self, record: T) -> Result<T> {
        let mut records = self.records.write().await;
        if records.contains_key(record.id()) {
            return Err(PersistError::Duplicate {
                kind: T::KIND,
                id: record.id().to_string(),
            });
        }
        records.insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self, page: Page) -> Result<Vec<T>> {
        let all = self.select(|_| true).await;
        let skip = usize::try_from(page.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(0);
        Ok(all.into_iter().skip(skip).take(limit).collect())
    }

    async fn replace(&self, record: T) -> Result<Option<T>> {
        let mut records = self.records.write().await;
        match records.get_mut(record.id()) {
            Some(existing) => {
                *existing = record.clone();
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl FanpageStore for MemoryCollection<Fanpage> {
    async fn find_by_page_id(&self, page_id: &str) -> Result<Option<Fanpage>> {
        Ok(self.select(|f| f.page_id == page_id).await.into_iter().next())
    }
}

#[async_trait]
impl AdGroupStore for MemoryCollection<AdGroup> {
    async fn get_many(&self, ids: &[String]) -> Result<Vec<AdGroup>> {
        Ok(self.select(|g| ids.contains(&g.id)).await)
    }
}

#[async_trait]
impl OrderStore for MemoryCollection<Order> {
    async fn find_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Order>> {
        let mut orders = self
            .select(|o| start <= o.order_date && o.order_date < end)
            .await;
        orders.sort_by_key(|o| o.order_date);
        Ok(orders)
    }
}

#[async_trait]
impl CostStore for MemoryCollection<OtherCost> {
    async fn find_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<OtherCost>> {
        let mut costs = self.select(|c| start <= c.date && c.date <= end).await;
        costs.sort_by_key(|c| c.date);
        Ok(costs)
    }
}

#[async_trait]
impl OpenAIConfigStore for MemoryCollection<OpenAIConfig> {
    async fn set_default(&self, id: &str) -> Result<Option<OpenAIConfig>> {
        let mut records = self.records.write().await;
        let Some(scope) = records.get(id).map(|c| c.fanpage_id.clone()) else {
            return Ok(None);
        };
        let now = Utc::now();
        for config in records.values_mut().filter(|c| c.fanpage_id == scope) {
            let is_target = config.id == id;
            if config.is_default != is_target {
                config.is_default = is_target;
                config.updated_at = now;
            }
        }
        Ok(records.get(id).cloned())
    }
}

#[async_trait]
impl ApiTokenStore for MemoryCollection<ApiToken> {
    async fn update_status(&self, id: &str, update: &TokenStatusUpdate) -> Result<Option<ApiToken>> {
        Ok(self.modify(id, |token| apply_status(token, update)).await)
    }

    async fn rotate(
        &self,
        id: &str,
        new_token: &str,
        update: &TokenStatusUpdate,
        notes: Option<String>,
    ) -> Result<Option<ApiToken>> {
        Ok(self
            .modify(id, |token| {
                apply_status(token, update);
                token.token = new_token.to_string();
                token.rotated_at = Some(update.checked_at);
                if notes.is_some() {
                    token.notes = notes;
                }
            })
            .await)
    }
}

fn apply_status(token: &mut ApiToken, update: &TokenStatusUpdate) {
    token.status = update.status;
    token.status_message = update.message.clone();
    token.scopes = update.scopes.clone();
    token.last_checked_at = Some(update.checked_at);
    token.updated_at = update.checked_at;
}
