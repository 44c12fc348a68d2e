use async_trait::async_trait;
use bson::doc;
use mongodb::{Client, Database};

use crate::dbs::mongo::models::{
    MongoAdGroup, MongoApiToken, MongoCustomer, MongoFanpage, MongoOpenAIConfig, MongoOrder,
    MongoOtherCost, MongoProduct, MongoQuote,
};
use crate::dbs::mongo::repositories::{
    MongoConversationRepository, MongoMessageRepository, MongoRepository,
};
use crate::error::{PersistError, Result};
use crate::trait_client::{
    AdGroupStore, ApiTokenStore, ConversationStore, CostStore, FanpageStore, MessageStore,
    OpenAIConfigStore, OrderStore, Persistence, RecordStore,
};
use fanshop_types::{Customer, Product, Quote};

pub struct MongoPersistence {
    database: Database,
    fanpages: MongoRepository<MongoFanpage>,
    products: MongoRepository<MongoProduct>,
    customers: MongoRepository<MongoCustomer>,
    quotes: MongoRepository<MongoQuote>,
    ad_groups: MongoRepository<MongoAdGroup>,
    other_costs: MongoRepository<MongoOtherCost>,
    orders: MongoRepository<MongoOrder>,
    openai_configs: MongoRepository<MongoOpenAIConfig>,
    api_tokens: MongoRepository<MongoApiToken>,
    conversations: MongoConversationRepository,
    messages: MongoMessageRepository,
}

impl MongoPersistence {
    /// Connect to MongoDB and build one repository per collection
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        tracing::info!(database = %database, "Connected to MongoDB");
        Ok(Self::with_database(client.database(database)))
    }

    pub fn with_database(database: Database) -> Self {
        Self {
            fanpages: MongoRepository::new(&database),
            products: MongoRepository::new(&database),
            customers: MongoRepository::new(&database),
            quotes: MongoRepository::new(&database),
            ad_groups: MongoRepository::new(&database),
            other_costs: MongoRepository::new(&database),
            orders: MongoRepository::new(&database),
            openai_configs: MongoRepository::new(&database),
            api_tokens: MongoRepository::new(&database),
            conversations: MongoConversationRepository::new(&database),
            messages: MongoMessageRepository::new(&database),
            database,
        }
    }

    /// Raw handle for migrations and maintenance jobs
    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl Persistence for MongoPersistence {
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
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
