pub mod attribution;
pub mod client;
pub mod config;
pub mod token;
pub mod webhook;

pub use attribution::extract_ad_group_id;
pub use client::GraphClient;
pub use config::GraphConfig;
pub use token::{classify_provider_error, TokenCheck, TokenValidator};
pub use webhook::{MessagingEvent, WebhookEntry, WebhookPayload};
