pub mod api_tokens;
pub mod conversations;
pub mod crud;
pub mod docs;
pub mod health;
pub mod openai_configs;
pub mod reports;
pub mod webhook;
