use std::sync::Arc;

use fanshop_api::{build_router, config::Config, init_logging, state::AppState};
use fanshop_facebook::{GraphClient, TokenValidator};
use fanshop_persist::{MongoPersistence, Persistence};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Fanshop API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);
    if config.webhook.verify_token.is_empty() {
        tracing::warn!("MESSENGER_VERIFY_TOKEN is not set, webhook verification will be rejected");
    }

    tracing::info!("Connecting to MongoDB");
    let mongo = MongoPersistence::connect(&config.mongodb_uri, &config.mongodb.database).await?;
    let persist: Arc<dyn Persistence> = Arc::new(mongo);
    if let Err(e) = persist.ping().await {
        tracing::warn!("MongoDB ping failed at startup: {}", e);
    }

    let graph: Arc<dyn TokenValidator> = Arc::new(GraphClient::new(&config.facebook)?);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, persist, graph));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
