use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    routes::crud::{insert_new, parse_body},
    state::AppState,
};
use fanshop_types::{OpenAIConfig, Record};

/// Create a config. `isDefault: true` goes through the scoped default switch
/// so the scope never ends up with two defaults.
pub async fn create_config(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<OpenAIConfig>)> {
    let mut config: OpenAIConfig = parse_body(body)?;
    let wants_default = config.is_default;
    config.is_default = false;

    let created = insert_new(&state, config).await?;
    if !wants_default {
        return Ok((StatusCode::CREATED, Json(created)));
    }

    let updated = state
        .persist
        .openai_configs()
        .set_default(&created.id)
        .await?
        .ok_or_else(|| ApiError::not_found(OpenAIConfig::KIND, created.id.clone()))?;
    Ok((StatusCode::CREATED, Json(updated)))
}

/// Make a config the default of its scope
#[utoipa::path(
    post,
    path = "/openai-configs/{id}/default",
    params(("id" = String, Path, description = "OpenAI config id")),
    responses(
        (status = 200, description = "Config is now the default of its scope"),
        (status = 404, description = "No such config")
    ),
    tag = "openai-configs"
)]
pub async fn set_default(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<OpenAIConfig>> {
    let updated = state
        .persist
        .openai_configs()
        .set_default(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(OpenAIConfig::KIND, id.clone()))?;

    tracing::info!(config_id = %id, scope = ?updated.fanpage_id, "Default OpenAI config changed");
    Ok(Json(updated))
}
