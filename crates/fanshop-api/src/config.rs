use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use fanshop_facebook::GraphConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub mongodb: MongoDbConfig,
    #[serde(default)]
    pub facebook: GraphConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    pub database: String,
}

impl Default for MongoDbConfig {
    fn default() -> Self {
        Self {
            database: "fanshop".to_string(),
        }
    }
}

/// Calendar used to bucket report rows
#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset(),
            max_range_days: default_max_range_days(),
        }
    }
}

fn default_utc_offset() -> i32 {
    7
}

fn default_max_range_days() -> i64 {
    366
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Hub verification token, loaded from `MESSENGER_VERIFY_TOKEN`
    #[serde(default, skip_deserializing)]
    pub verify_token: String,
    /// Inbound texts containing any of these (case-insensitive) ask for a human
    #[serde(default = "default_handoff_keywords")]
    pub handoff_keywords: Vec<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            verify_token: String::new(),
            handoff_keywords: default_handoff_keywords(),
        }
    }
}

fn default_handoff_keywords() -> Vec<String> {
    ["nhân viên", "nhan vien", "tư vấn viên", "người thật", "human"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `FANSHOP__SECTION__KEY` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::load_settings()?;

        // Load secrets from ENV (not in TOML)
        cfg.mongodb_uri = std::env::var("MONGODB_URI")
            .map_err(|_| ConfigError::Message("MONGODB_URI environment variable is required".to_string()))?;
        if let Ok(token) = std::env::var("MESSENGER_VERIFY_TOKEN") {
            cfg.webhook.verify_token = token;
        }

        Ok(cfg)
    }

    /// Settings without secrets, for tools that only need part of the config
    pub fn load_settings() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("FANSHOP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.origins")
                    .with_list_parse_key("webhook.handoff_keywords")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}
