use axum::Json;
use utoipa::OpenApi;

use crate::routes::{api_tokens, conversations, health, openai_configs, reports, webhook};

#[derive(OpenApi)]
#[openapi(
    info(title = "Fanshop back office API"),
    paths(
        health::health_check,
        webhook::verify,
        webhook::receive,
        conversations::transition,
        openai_configs::set_default,
        api_tokens::rotate_token,
        api_tokens::validate_token,
        reports::ad_group_profit_report,
        reports::agent_summary,
        reports::message_stats,
    ),
    components(schemas(
        health::HealthResponse,
        api_tokens::RotateTokenRequest,
        conversations::TransitionRequest,
    )),
    tags(
        (name = "health"),
        (name = "webhook", description = "Messenger subscription"),
        (name = "conversations"),
        (name = "openai-configs"),
        (name = "api-tokens"),
        (name = "reports")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
