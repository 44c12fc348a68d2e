use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use fanshop_types::{
    AdGroup, ApiToken, ChatMessage, Conversation, ConversationState, Customer, Fanpage,
    MessageDirection, OpenAIConfig, Order, OtherCost, Product, Quote, Record, TokenStatus,
};

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Pagination window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub skip: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            skip: 0,
        }
    }
}

impl Page {
    /// Clamp client-supplied values into a usable window
    pub fn new(limit: Option<i64>, skip: Option<u64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
            skip: skip.unwrap_or(0),
        }
    }
}

/// Basic document operations shared by every collection.
///
/// Records reach the store with their identity already assigned.
#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    async fn insert(&self, record: T) -> Result<T>;

    async fn get(&self, id: &str) -> Result<Option<T>>;

    /// Newest first
    async fn list(&self, page: Page) -> Result<Vec<T>>;

    /// Replace the stored document with the same id. `None` when it does not exist.
    async fn replace(&self, record: T) -> Result<Option<T>>;

    /// `false` when nothing was deleted
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait FanpageStore: RecordStore<Fanpage> {
    /// Look up a fanpage by the provider page id from webhook entries
    async fn find_by_page_id(&self, page_id: &str) -> Result<Option<Fanpage>>;
}

#[async_trait]
pub trait AdGroupStore: RecordStore<AdGroup> {
    async fn get_many(&self, ids: &[String]) -> Result<Vec<AdGroup>>;
}

#[async_trait]
pub trait OrderStore: RecordStore<Order> {
    /// Orders with `start <= orderDate < end`
    async fn find_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Order>>;
}

#[async_trait]
pub trait CostStore: RecordStore<OtherCost> {
    /// Costs dated within `start..=end`
    async fn find_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<OtherCost>>;
}

#[async_trait]
pub trait OpenAIConfigStore: RecordStore<OpenAIConfig> {
    /// Make `id` the default of its scope and clear the flag on every other
    /// config in that scope
    async fn set_default(&self, id: &str) -> Result<Option<OpenAIConfig>>;
}

/// Outcome of a token check, as stored on the ApiToken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStatusUpdate {
    pub status: TokenStatus,
    pub message: Option<String>,
    pub scopes: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

#[async_trait]
pub trait ApiTokenStore: RecordStore<ApiToken> {
    async fn update_status(&self, id: &str, update: &TokenStatusUpdate) -> Result<Option<ApiToken>>;

    /// Swap in a new token value along with the check result that accepted it
    async fn rotate(
        &self,
        id: &str,
        new_token: &str,
        update: &TokenStatusUpdate,
        notes: Option<String>,
    ) -> Result<Option<ApiToken>>;
}

/// One message applied to its conversation counters
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTouch {
    pub fanpage_id: String,
    pub sender_psid: String,
    pub direction: MessageDirection,
    /// Overwrites `lastAdGroupId` when set
    pub ad_group_id: Option<String>,
    pub at: DateTime<Utc>,
    /// State used only when the conversation does not exist yet
    pub initial_state: ConversationState,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationFilter {
    pub fanpage_id: Option<String>,
    pub state: Option<ConversationState>,
    pub limit: Option<i64>,
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Atomically upsert the (fanpage, sender) conversation and bump its counters
    async fn record_message(&self, touch: &ConversationTouch) -> Result<Conversation>;

    /// Upsert the conversation and stamp `lastAdGroupId` from a referral that
    /// carried no message. Counters and `lastMessageAt` are left alone.
    async fn record_referral(&self, touch: &ConversationTouch) -> Result<Conversation>;

    async fn get(&self, id: &str) -> Result<Option<Conversation>>;

    async fn find_by_pair(&self, fanpage_id: &str, sender_psid: &str) -> Result<Option<Conversation>>;

    /// Most recently active first
    async fn list(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>>;

    /// Move to `next` only if the stored state is still `expected`.
    /// `None` when the state changed underneath or the conversation is gone.
    async fn compare_and_set_state(
        &self,
        id: &str,
        expected: ConversationState,
        next: ConversationState,
    ) -> Result<Option<Conversation>>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: ChatMessage) -> Result<ChatMessage>;

    /// Latest `limit` messages of a conversation, oldest first
    async fn list_for_pair(
        &self,
        fanpage_id: &str,
        sender_psid: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>>;

    /// Messages with `start <= receivedAt < end`, oldest first
    async fn list_in_range(
        &self,
        fanpage_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>>;

    /// Clear `awaitingHuman` on a conversation's messages. Returns how many changed.
    async fn clear_awaiting_human(&self, fanpage_id: &str, sender_psid: &str) -> Result<u64>;
}

/// Every collection the back office works with
#[async_trait]
pub trait Persistence: Send + Sync {
    fn fanpages(&self) -> &dyn FanpageStore;
    fn products(&self) -> &dyn RecordStore<Product>;
    fn customers(&self) -> &dyn RecordStore<Customer>;
    fn quotes(&self) -> &dyn RecordStore<Quote>;
    fn ad_groups(&self) -> &dyn AdGroupStore;
    fn other_costs(&self) -> &dyn CostStore;
    fn orders(&self) -> &dyn OrderStore;
    fn openai_configs(&self) -> &dyn OpenAIConfigStore;
    fn api_tokens(&self) -> &dyn ApiTokenStore;
    fn conversations(&self) -> &dyn ConversationStore;
    fn messages(&self) -> &dyn MessageStore;

    /// Round-trip to the backing database
    async fn ping(&self) -> Result<()>;
}
