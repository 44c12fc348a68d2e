pub mod dbs;
pub mod error;
pub mod migrations;
pub mod trait_client;

pub use dbs::memory::MemoryPersistence;
#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoPersistence;
pub use error::{PersistError, Result};
pub use trait_client::{
    AdGroupStore, ApiTokenStore, ConversationFilter, ConversationStore, ConversationTouch,
    CostStore, FanpageStore, MessageStore, OpenAIConfigStore, OrderStore, Page, Persistence,
    RecordStore, TokenStatusUpdate,
};
