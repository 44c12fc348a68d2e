use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    error::{ApiError, ApiResult},
    routes::crud::parse_body,
    services::handoff,
    state::AppState,
};
use fanshop_persist::trait_client::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use fanshop_persist::ConversationFilter;
use fanshop_types::{ChatMessage, Conversation, ConversationState, HandoffEvent};

const CONVERSATION: &str = "conversation";

/// A conversation plus the legacy flags older clients still read
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub needs_human: bool,
    pub auto_ai_enabled: bool,
}

impl From<Conversation> for ConversationView {
    fn from(conversation: Conversation) -> Self {
        Self {
            needs_human: conversation.needs_human(),
            auto_ai_enabled: conversation.auto_ai_enabled(),
            conversation,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    pub fanpage_id: Option<String>,
    pub state: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// customer_requested_human, agent_replied, agent_released or auto_ai_disabled
    #[schema(value_type = String)]
    pub event: HandoffEvent,
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversationQuery>,
) -> ApiResult<Json<Vec<ConversationView>>> {
    let conversation_state = query
        .state
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<ConversationState>)
        .transpose()
        .map_err(|e| ApiError::field("state", e))?;

    let filter = ConversationFilter {
        fanpage_id: query.fanpage_id.filter(|f| !f.is_empty()),
        state: conversation_state,
        limit: Some(query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)),
    };
    let conversations = state.persist.conversations().list(&filter).await?;
    Ok(Json(conversations.into_iter().map(ConversationView::from).collect()))
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationView>> {
    let conversation = load(&state, &id).await?;
    Ok(Json(conversation.into()))
}

/// Latest messages of the thread, oldest first
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let conversation = load(&state, &id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);

    let messages = state
        .persist
        .messages()
        .list_for_pair(&conversation.fanpage_id, &conversation.sender_psid, limit)
        .await?;
    Ok(Json(messages))
}

/// Apply a handoff event to a conversation
#[utoipa::path(
    post,
    path = "/conversations/{id}/transition",
    params(("id" = String, Path, description = "Conversation id")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Conversation after the event"),
        (status = 404, description = "No such conversation"),
        (status = 409, description = "State kept changing concurrently")
    ),
    tag = "conversations"
)]
pub async fn transition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<ConversationView>> {
    let request: TransitionRequest = parse_body(body)?;
    let conversation = load(&state, &id).await?;
    let updated = handoff::apply_event(state.persist.as_ref(), conversation, request.event).await?;
    Ok(Json(updated.into()))
}

async fn load(state: &AppState, id: &str) -> ApiResult<Conversation> {
    state
        .persist
        .conversations()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(CONVERSATION, id))
}
