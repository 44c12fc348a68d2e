//! Process-local backend used by tests and local demos.

mod collection;
mod conversation;

pub use collection::MemoryCollection;
pub use conversation::{MemoryConversations, MemoryMessages};

use async_trait::async_trait;

use crate::error::Result;
use crate::trait_client::{
    AdGroupStore, ApiTokenStore, ConversationStore, CostStore, FanpageStore, MessageStore,
    OpenAIConfigStore, OrderStore, Persistence, RecordStore,
};
use fanshop_types::{
    AdGroup, ApiToken, Customer, Fanpage, OpenAIConfig, Order, OtherCost, Product, Quote,
};

#[derive(Default)]
pub struct MemoryPersistence {
    fanpages: MemoryCollection<Fanpage>,
    products: MemoryCollection<Product>,
    customers: MemoryCollection<Customer>,
    quotes: MemoryCollection<Quote>,
    ad_groups: MemoryCollection<AdGroup>,
    other_costs: MemoryCollection<OtherCost>,
    orders: MemoryCollection<Order>,
    openai_configs: MemoryCollection<OpenAIConfig>,
    api_tokens: MemoryCollection<ApiToken>,
    conversations: MemoryConversations,
    messages: MemoryMessages,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    fn fanpages(&self) -> &dyn FanpageStore {
        &self.fanpages
    }

    fn products(&self) -> &dyn RecordStore<Product> {
        &self.products
    }

    fn customers(&self) -> &dyn RecordStore<Customer> {
        &self.customers
    }

    fn quotes(&self) -> &dyn RecordStore<Quote> {
        &self.quotes
    }

    fn ad_groups(&self) -> &dyn AdGroupStore {
        &self.ad_groups
    }

    fn other_costs(&self) -> &dyn CostStore {
        &self.other_costs
    }

    fn orders(&self) -> &dyn OrderStore {
        &self.orders
    }

    fn openai_configs(&self) -> &dyn OpenAIConfigStore {
        &self.openai_configs
    }

    fn api_tokens(&self) -> &dyn ApiTokenStore {
        &self.api_tokens
    }

    fn conversations(&self) -> &dyn ConversationStore {
        &self.conversations
    }

    fn messages(&self) -> &dyn MessageStore {
        &self.messages
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
