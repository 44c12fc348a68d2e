use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    routes::crud::parse_body,
    services::ingest,
    state::AppState,
};
use fanshop_facebook::WebhookPayload;

const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Subscription handshake: echo the challenge when the verify token matches
#[utoipa::path(
    get,
    path = "/webhook/messenger",
    responses(
        (status = 200, description = "Challenge echoed back"),
        (status = 403, description = "Verify token mismatch")
    ),
    tag = "webhook"
)]
pub async fn verify(State(state): State<Arc<AppState>>, Query(query): Query<VerifyQuery>) -> Response {
    let expected = state.config.webhook.verify_token.as_str();
    let subscribed = query.mode.as_deref() == Some("subscribe")
        && !expected.is_empty()
        && query.verify_token.as_deref() == Some(expected);

    if subscribed {
        tracing::info!("Messenger webhook verified");
        (StatusCode::OK, query.challenge.unwrap_or_default()).into_response()
    } else {
        tracing::warn!(mode = ?query.mode, "Messenger webhook verification rejected");
        StatusCode::FORBIDDEN.into_response()
    }
}

/// Event delivery. Always acknowledged for page objects so the provider
/// does not retry; per-event failures only show up in the logs.
#[utoipa::path(
    post,
    path = "/webhook/messenger",
    responses(
        (status = 200, description = "EVENT_RECEIVED"),
        (status = 404, description = "Not a page subscription")
    ),
    tag = "webhook"
)]
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, &'static str)> {
    let payload: WebhookPayload = parse_body(body)?;
    if !payload.is_page() {
        return Err(ApiError::not_found("webhook object", payload.object));
    }

    let messages = ingest::collect_messages(&payload, &state.config.webhook.handoff_keywords, Utc::now());
    ingest::ingest(state.persist.as_ref(), messages).await;

    Ok((StatusCode::OK, EVENT_RECEIVED))
}
