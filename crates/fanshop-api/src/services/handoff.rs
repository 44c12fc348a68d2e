use fanshop_persist::Persistence;
use fanshop_types::{Conversation, ConversationState, HandoffEvent};

use crate::error::{ApiError, ApiResult};

const CONVERSATION: &str = "conversation";

/// Attempts before giving up on a conversation whose state keeps moving
const MAX_ATTEMPTS: usize = 3;

/// Apply `event` to a conversation through compare-and-set, re-reading the
/// stored state whenever another writer got there first.
///
/// Leaving `AWAITING_HUMAN` clears the awaiting flag on the thread's messages.
pub async fn apply_event(
    persist: &dyn Persistence,
    conversation: Conversation,
    event: HandoffEvent,
) -> ApiResult<Conversation> {
    let id = conversation.id.clone();
    let mut current = conversation;

    for attempt in 1..=MAX_ATTEMPTS {
        let from = current.state;
        let next = from.apply(event);
        if next == from {
            return Ok(current);
        }

        match persist
            .conversations()
            .compare_and_set_state(&id, from, next)
            .await?
        {
            Some(updated) => {
                tracing::info!(
                    conversation_id = %id,
                    from = from.as_str(),
                    to = next.as_str(),
                    event = ?event,
                    "Conversation state changed"
                );
                if from == ConversationState::AwaitingHuman {
                    let cleared = persist
                        .messages()
                        .clear_awaiting_human(&updated.fanpage_id, &updated.sender_psid)
                        .await?;
                    tracing::debug!(conversation_id = %id, cleared, "Cleared awaiting-human flags");
                }
                return Ok(updated);
            }
            None => {
                tracing::debug!(conversation_id = %id, attempt, "State changed underneath, re-reading");
                current = persist
                    .conversations()
                    .get(&id)
                    .await?
                    .ok_or_else(|| ApiError::not_found(CONVERSATION, id.clone()))?;
            }
        }
    }

    Err(ApiError::Conflict(format!(
        "conversation {} is changing concurrently, try again",
        id
    )))
}
