mod catalog;
mod marketing;
mod messaging;
mod sales;
mod settings;

pub use catalog::{Customer, Product, Quote};
pub use marketing::{AdGroup, AdGroupStatus, CostCategory, OtherCost};
pub use messaging::{ChatMessage, Conversation, Fanpage, MessageDirection};
pub use sales::{Order, OrderStatus};
pub use settings::{ApiToken, OpenAIConfig, TokenStatus};

use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    #[default]
    Active,
    Inactive,
}

const MASK: char = '…';

/// Shorten a secret to its first and last four characters
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, MASK, tail)
}

/// True when a client echoed back a masked value (or nothing) instead of a new secret
pub(crate) fn is_placeholder_secret(value: &str) -> bool {
    value.is_empty() || value == "****" || value.contains(MASK)
}

pub(crate) fn serialize_masked<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&mask_secret(value))
}
