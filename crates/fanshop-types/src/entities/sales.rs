use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{require_non_empty, require_non_negative, Record, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Completed,
    Cancelled,
    Returned,
}

impl OrderStatus {
    /// Cancelled and returned orders never count as revenue
    pub fn is_billable(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub product_id: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub ad_group_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub unit_price: f64,
    /// Amount billed to the customer. Defaults to `quantity * unit_price`
    /// when sent as zero.
    #[serde(default)]
    pub revenue: f64,
    /// Cost of goods for the whole order
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub shipping_fee: f64,
    #[serde(default)]
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

fn default_quantity() -> u32 {
    1
}

impl Order {
    /// Cost charged against this order in profit figures
    pub fn total_cost(&self) -> f64 {
        self.cost + self.shipping_fee
    }

    pub fn profit(&self) -> f64 {
        self.revenue - self.total_cost()
    }
}

impl Record for Order {
    const KIND: &'static str = "order";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn assign_identity(&mut self, id: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
        self.updated_at = updated_at;
        if self.revenue == 0.0 {
            self.revenue = self.unit_price * f64::from(self.quantity);
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("productId", &self.product_id)?;
        if self.quantity == 0 {
            return Err(ValidationError::new("quantity", "must be at least 1"));
        }
        require_non_negative("unitPrice", self.unit_price)?;
        require_non_negative("revenue", self.revenue)?;
        require_non_negative("cost", self.cost)?;
        require_non_negative("shippingFee", self.shipping_fee)
    }
}
