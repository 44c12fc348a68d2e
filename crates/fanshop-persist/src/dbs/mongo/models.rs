use bson::DateTime as BsonDateTime;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use fanshop_types::{
    ActivityStatus, AdGroup, AdGroupStatus, ApiToken, ChatMessage, Conversation,
    ConversationState, CostCategory, Customer, Fanpage, MessageDirection, OpenAIConfig, Order,
    OrderStatus, OtherCost, Product, Quote, Record, TokenStatus,
};

pub const FANPAGES: &str = "fanpages";
pub const PRODUCTS: &str = "products";
pub const CUSTOMERS: &str = "customers";
pub const QUOTES: &str = "quotes";
pub const AD_GROUPS: &str = "ad_groups";
pub const OTHER_COSTS: &str = "other_costs";
pub const ORDERS: &str = "orders";
pub const OPENAI_CONFIGS: &str = "openai_configs";
pub const API_TOKENS: &str = "api_tokens";
pub const CONVERSATIONS: &str = "conversations";
pub const CHAT_MESSAGES: &str = "chat_messages";

/// A MongoDB document shape paired with the domain record it stores.
///
/// Timestamps are stored as BSON dates so range filters and sorts work
/// natively; the domain records keep chrono types for JSON.
pub trait MongoDocument:
    Serialize + DeserializeOwned + Send + Sync + Unpin + 'static
{
    type Record: Record;

    const COLLECTION: &'static str;

    fn from_record(record: Self::Record) -> Self;

    fn into_record(self) -> Self::Record;
}

fn optional_time(value: Option<chrono::DateTime<chrono::Utc>>) -> Option<BsonDateTime> {
    value.map(BsonDateTime::from_chrono)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoFanpage {
    #[serde(rename = "_id")]
    pub id: String,
    pub page_id: String,
    pub name: String,
    pub access_token: String,
    pub status: ActivityStatus,
    #[serde(rename = "openAIConfigId")]
    pub openai_config_id: Option<String>,
    pub auto_ai_default: bool,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoFanpage {
    type Record = Fanpage;
    const COLLECTION: &'static str = FANPAGES;

    fn from_record(f: Fanpage) -> Self {
        Self {
            id: f.id,
            page_id: f.page_id,
            name: f.name,
            access_token: f.access_token,
            status: f.status,
            openai_config_id: f.openai_config_id,
            auto_ai_default: f.auto_ai_default,
            created_at: BsonDateTime::from_chrono(f.created_at),
            updated_at: BsonDateTime::from_chrono(f.updated_at),
        }
    }

    fn into_record(self) -> Fanpage {
        Fanpage {
            id: self.id,
            page_id: self.page_id,
            name: self.name,
            access_token: self.access_token,
            status: self.status,
            openai_config_id: self.openai_config_id,
            auto_ai_default: self.auto_ai_default,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoProduct {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub price: f64,
    pub cost: f64,
    pub active: bool,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoProduct {
    type Record = Product;
    const COLLECTION: &'static str = PRODUCTS;

    fn from_record(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            sku: p.sku,
            price: p.price,
            cost: p.cost,
            active: p.active,
            created_at: BsonDateTime::from_chrono(p.created_at),
            updated_at: BsonDateTime::from_chrono(p.updated_at),
        }
    }

    fn into_record(self) -> Product {
        Product {
            id: self.id,
            name: self.name,
            sku: self.sku,
            price: self.price,
            cost: self.cost,
            active: self.active,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoCustomer {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub fanpage_id: Option<String>,
    pub sender_psid: Option<String>,
    pub notes: Option<String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoCustomer {
    type Record = Customer;
    const COLLECTION: &'static str = CUSTOMERS;

    fn from_record(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            phone: c.phone,
            address: c.address,
            fanpage_id: c.fanpage_id,
            sender_psid: c.sender_psid,
            notes: c.notes,
            created_at: BsonDateTime::from_chrono(c.created_at),
            updated_at: BsonDateTime::from_chrono(c.updated_at),
        }
    }

    fn into_record(self) -> Customer {
        Customer {
            id: self.id,
            name: self.name,
            phone: self.phone,
            address: self.address,
            fanpage_id: self.fanpage_id,
            sender_psid: self.sender_psid,
            notes: self.notes,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoQuote {
    #[serde(rename = "_id")]
    pub id: String,
    pub product_id: String,
    pub customer_id: Option<String>,
    pub price: f64,
    pub quantity: u32,
    pub note: Option<String>,
    pub valid_until: Option<BsonDateTime>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoQuote {
    type Record = Quote;
    const COLLECTION: &'static str = QUOTES;

    fn from_record(q: Quote) -> Self {
        Self {
            id: q.id,
            product_id: q.product_id,
            customer_id: q.customer_id,
            price: q.price,
            quantity: q.quantity,
            note: q.note,
            valid_until: optional_time(q.valid_until),
            created_at: BsonDateTime::from_chrono(q.created_at),
            updated_at: BsonDateTime::from_chrono(q.updated_at),
        }
    }

    fn into_record(self) -> Quote {
        Quote {
            id: self.id,
            product_id: self.product_id,
            customer_id: self.customer_id,
            price: self.price,
            quantity: self.quantity,
            note: self.note,
            valid_until: self.valid_until.map(BsonDateTime::to_chrono),
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoAdGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub fanpage_id: Option<String>,
    pub product_id: Option<String>,
    pub agent_id: Option<String>,
    pub status: AdGroupStatus,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoAdGroup {
    type Record = AdGroup;
    const COLLECTION: &'static str = AD_GROUPS;

    fn from_record(g: AdGroup) -> Self {
        Self {
            id: g.id,
            name: g.name,
            fanpage_id: g.fanpage_id,
            product_id: g.product_id,
            agent_id: g.agent_id,
            status: g.status,
            created_at: BsonDateTime::from_chrono(g.created_at),
            updated_at: BsonDateTime::from_chrono(g.updated_at),
        }
    }

    fn into_record(self) -> AdGroup {
        AdGroup {
            id: self.id,
            name: self.name,
            fanpage_id: self.fanpage_id,
            product_id: self.product_id,
            agent_id: self.agent_id,
            status: self.status,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

/// `date` is kept as a `YYYY-MM-DD` string, which sorts and compares as a date
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoOtherCost {
    #[serde(rename = "_id")]
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub category: CostCategory,
    pub ad_group_id: Option<String>,
    pub description: Option<String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoOtherCost {
    type Record = OtherCost;
    const COLLECTION: &'static str = OTHER_COSTS;

    fn from_record(c: OtherCost) -> Self {
        Self {
            id: c.id,
            date: c.date,
            amount: c.amount,
            category: c.category,
            ad_group_id: c.ad_group_id,
            description: c.description,
            created_at: BsonDateTime::from_chrono(c.created_at),
            updated_at: BsonDateTime::from_chrono(c.updated_at),
        }
    }

    fn into_record(self) -> OtherCost {
        OtherCost {
            id: self.id,
            date: self.date,
            amount: self.amount,
            category: self.category,
            ad_group_id: self.ad_group_id,
            description: self.description,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoOrder {
    #[serde(rename = "_id")]
    pub id: String,
    pub customer_id: Option<String>,
    pub product_id: String,
    pub agent_id: Option<String>,
    pub ad_group_id: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
    pub revenue: f64,
    pub cost: f64,
    #[serde(default)]
    pub shipping_fee: f64,
    pub status: OrderStatus,
    pub order_date: BsonDateTime,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoOrder {
    type Record = Order;
    const COLLECTION: &'static str = ORDERS;

    fn from_record(o: Order) -> Self {
        Self {
            id: o.id,
            customer_id: o.customer_id,
            product_id: o.product_id,
            agent_id: o.agent_id,
            ad_group_id: o.ad_group_id,
            quantity: o.quantity,
            unit_price: o.unit_price,
            revenue: o.revenue,
            cost: o.cost,
            shipping_fee: o.shipping_fee,
            status: o.status,
            order_date: BsonDateTime::from_chrono(o.order_date),
            created_at: BsonDateTime::from_chrono(o.created_at),
            updated_at: BsonDateTime::from_chrono(o.updated_at),
        }
    }

    fn into_record(self) -> Order {
        Order {
            id: self.id,
            customer_id: self.customer_id,
            product_id: self.product_id,
            agent_id: self.agent_id,
            ad_group_id: self.ad_group_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            revenue: self.revenue,
            cost: self.cost,
            shipping_fee: self.shipping_fee,
            status: self.status,
            order_date: self.order_date.to_chrono(),
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoOpenAIConfig {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub fanpage_id: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    pub status: ActivityStatus,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoOpenAIConfig {
    type Record = OpenAIConfig;
    const COLLECTION: &'static str = OPENAI_CONFIGS;

    fn from_record(c: OpenAIConfig) -> Self {
        Self {
            id: c.id,
            name: c.name,
            api_key: c.api_key,
            model: c.model,
            temperature: c.temperature,
            max_tokens: c.max_tokens,
            system_prompt: c.system_prompt,
            fanpage_id: c.fanpage_id,
            is_default: c.is_default,
            status: c.status,
            created_at: BsonDateTime::from_chrono(c.created_at),
            updated_at: BsonDateTime::from_chrono(c.updated_at),
        }
    }

    fn into_record(self) -> OpenAIConfig {
        OpenAIConfig {
            id: self.id,
            name: self.name,
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            system_prompt: self.system_prompt,
            fanpage_id: self.fanpage_id,
            is_default: self.is_default,
            status: self.status,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoApiToken {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub fanpage_id: Option<String>,
    pub token: String,
    pub status: TokenStatus,
    pub status_message: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub last_checked_at: Option<BsonDateTime>,
    pub rotated_at: Option<BsonDateTime>,
    pub notes: Option<String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl MongoDocument for MongoApiToken {
    type Record = ApiToken;
    const COLLECTION: &'static str = API_TOKENS;

    fn from_record(t: ApiToken) -> Self {
        Self {
            id: t.id,
            name: t.name,
            fanpage_id: t.fanpage_id,
            token: t.token,
            status: t.status,
            status_message: t.status_message,
            scopes: t.scopes,
            last_checked_at: optional_time(t.last_checked_at),
            rotated_at: optional_time(t.rotated_at),
            notes: t.notes,
            created_at: BsonDateTime::from_chrono(t.created_at),
            updated_at: BsonDateTime::from_chrono(t.updated_at),
        }
    }

    fn into_record(self) -> ApiToken {
        ApiToken {
            id: self.id,
            name: self.name,
            fanpage_id: self.fanpage_id,
            token: self.token,
            status: self.status,
            status_message: self.status_message,
            scopes: self.scopes,
            last_checked_at: self.last_checked_at.map(BsonDateTime::to_chrono),
            rotated_at: self.rotated_at.map(BsonDateTime::to_chrono),
            notes: self.notes,
            created_at: self.created_at.to_chrono(),
            updated_at: self.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoChatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub fanpage_id: String,
    pub sender_psid: String,
    pub direction: MessageDirection,
    pub content: String,
    pub ad_group_id: Option<String>,
    #[serde(default)]
    pub awaiting_human: bool,
    pub provider_message_id: Option<String>,
    pub received_at: BsonDateTime,
}

impl From<ChatMessage> for MongoChatMessage {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            fanpage_id: m.fanpage_id,
            sender_psid: m.sender_psid,
            direction: m.direction,
            content: m.content,
            ad_group_id: m.ad_group_id,
            awaiting_human: m.awaiting_human,
            provider_message_id: m.provider_message_id,
            received_at: BsonDateTime::from_chrono(m.received_at),
        }
    }
}

impl From<MongoChatMessage> for ChatMessage {
    fn from(m: MongoChatMessage) -> Self {
        Self {
            id: m.id,
            fanpage_id: m.fanpage_id,
            sender_psid: m.sender_psid,
            direction: m.direction,
            content: m.content,
            ad_group_id: m.ad_group_id,
            awaiting_human: m.awaiting_human,
            provider_message_id: m.provider_message_id,
            received_at: m.received_at.to_chrono(),
        }
    }
}

/// Counters default to zero: an upsert only creates the counter it increments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MongoConversation {
    #[serde(rename = "_id")]
    pub id: String,
    pub fanpage_id: String,
    pub sender_psid: String,
    #[serde(default)]
    pub total_messages: i64,
    #[serde(default)]
    pub inbound_count: i64,
    #[serde(default)]
    pub outbound_count: i64,
    pub last_ad_group_id: Option<String>,
    pub last_message_at: Option<BsonDateTime>,
    pub state: ConversationState,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl From<MongoConversation> for Conversation {
    fn from(c: MongoConversation) -> Self {
        Self {
            id: c.id,
            fanpage_id: c.fanpage_id,
            sender_psid: c.sender_psid,
            total_messages: c.total_messages,
            inbound_count: c.inbound_count,
            outbound_count: c.outbound_count,
            last_ad_group_id: c.last_ad_group_id,
            last_message_at: c.last_message_at.map(BsonDateTime::to_chrono),
            state: c.state,
            created_at: c.created_at.to_chrono(),
            updated_at: c.updated_at.to_chrono(),
        }
    }
}
