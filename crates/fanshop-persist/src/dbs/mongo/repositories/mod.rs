pub mod conversation;
pub mod record;
pub mod specialized;

pub use conversation::{MongoConversationRepository, MongoMessageRepository};
pub use record::MongoRepository;
