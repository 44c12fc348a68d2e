pub mod entities;
pub mod record;
pub mod state;

pub use entities::{
    ActivityStatus, AdGroup, AdGroupStatus, ApiToken, ChatMessage, Conversation, CostCategory,
    Customer, Fanpage, MessageDirection, OpenAIConfig, Order, OrderStatus, OtherCost, Product,
    Quote, TokenStatus,
};
pub use record::{new_id, Record, ValidationError};
pub use state::{ConversationState, HandoffEvent};
