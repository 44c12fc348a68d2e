pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::middleware::logging;
use crate::routes::{
    api_tokens, conversations, crud, docs, health, openai_configs, reports, webhook,
};
use crate::state::AppState;
use fanshop_types::{
    AdGroup, ApiToken, Customer, Fanpage, OpenAIConfig, Order, OtherCost, Product, Quote,
};

pub use crate::error::{ApiError, ApiResult};

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        // Records
        .merge(crud::routes::<Fanpage>("/fanpages"))
        .merge(crud::routes::<Product>("/products"))
        .merge(crud::routes::<Customer>("/customers"))
        .merge(crud::routes::<Quote>("/quotes"))
        .merge(crud::routes::<AdGroup>("/ad-groups"))
        .merge(crud::routes::<OtherCost>("/other-costs"))
        .merge(crud::routes::<Order>("/orders"))
        .merge(crud::routes_with_create::<OpenAIConfig>(
            "/openai-configs",
            post(openai_configs::create_config),
        ))
        .route("/openai-configs/:id/default", post(openai_configs::set_default))
        .merge(crud::routes_with_create::<ApiToken>("/api-tokens", post(api_tokens::create_token)))
        .route("/api-tokens/:id/rotate", post(api_tokens::rotate_token))
        .route("/api-tokens/:id/validate", post(api_tokens::validate_token))
        // Conversations
        .route("/conversations", get(conversations::list_conversations))
        .route("/conversations/:id", get(conversations::get_conversation))
        .route("/conversations/:id/messages", get(conversations::list_messages))
        .route("/conversations/:id/transition", post(conversations::transition))
        // Messenger
        .route("/webhook/messenger", get(webhook::verify).post(webhook::receive))
        // Reports
        .route("/ad-group-profit-report", get(reports::ad_group_profit_report))
        .route("/summary2", get(reports::agent_summary))
        .route("/message-stats", get(reports::message_stats));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs.max(1));

    api_routes
        .layer(axum_middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if !config.cors.enabled {
        return CorsLayer::new();
    }

    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    if config.cors.origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let parsed_origins: Vec<axum::http::HeaderValue> = config
            .cors
            .origins
            .iter()
            .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
            .collect();

        cors.allow_origin(parsed_origins)
    }
}

pub fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            registry.with(tracing_subscriber::fmt::layer().pretty()).init();
        }
    }
}
