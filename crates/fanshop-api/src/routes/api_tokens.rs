use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::ApiResult,
    routes::crud::{insert_new, parse_body},
    services::tokens,
    state::AppState,
};
use fanshop_types::{ApiToken, TokenStatus};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RotateTokenRequest {
    pub new_token: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Create a token. Check results only come from validation, never the body.
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<ApiToken>)> {
    let mut token: ApiToken = parse_body(body)?;
    token.status = TokenStatus::Unknown;
    token.status_message = None;
    token.scopes.clear();
    token.last_checked_at = None;
    token.rotated_at = None;

    let created = insert_new(&state, token).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Swap in a new token after the provider accepts it
#[utoipa::path(
    post,
    path = "/api-tokens/{id}/rotate",
    params(("id" = String, Path, description = "API token id")),
    request_body = RotateTokenRequest,
    responses(
        (status = 200, description = "Token rotated"),
        (status = 400, description = "New token rejected by the provider"),
        (status = 404, description = "No such token")
    ),
    tag = "api-tokens"
)]
pub async fn rotate_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<ApiToken>> {
    let request: RotateTokenRequest = parse_body(body)?;
    let rotated = tokens::rotate(
        state.persist.as_ref(),
        state.tokens.as_ref(),
        &id,
        &request.new_token,
        request.notes,
    )
    .await?;
    Ok(Json(rotated))
}

/// Check the stored token against the provider and record the result
#[utoipa::path(
    post,
    path = "/api-tokens/{id}/validate",
    params(("id" = String, Path, description = "API token id")),
    responses(
        (status = 200, description = "Check result stored on the token"),
        (status = 404, description = "No such token")
    ),
    tag = "api-tokens"
)]
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiToken>> {
    let token = tokens::validate_stored(state.persist.as_ref(), state.tokens.as_ref(), &id).await?;
    Ok(Json(token))
}
