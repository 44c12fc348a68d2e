use serde::{Deserialize, Serialize};

/// Who is currently answering a conversation.
///
/// Replaces the independent `needsHuman` / `autoAiEnabled` flags, which
/// could disagree with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    AiHandling,
    AwaitingHuman,
    HumanHandling,
}

/// Handoff events that move a conversation between states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffEvent {
    /// Customer asked for a person (keyword or quick reply)
    CustomerRequestedHuman,
    /// A human agent answered from the page inbox
    AgentReplied,
    /// An agent handed the thread back to the auto-responder
    AgentReleased,
    /// Auto replies switched off for this thread
    AutoAiDisabled,
}

impl ConversationState {
    /// Next state after `event`. Events that do not apply leave the state unchanged.
    pub fn apply(self, event: HandoffEvent) -> Self {
        use ConversationState::*;
        use HandoffEvent::*;

        match (self, event) {
            (AiHandling, CustomerRequestedHuman) => AwaitingHuman,
            (AiHandling | AwaitingHuman, AgentReplied) => HumanHandling,
            (_, AgentReleased) => AiHandling,
            (AiHandling, AutoAiDisabled) => HumanHandling,
            (state, _) => state,
        }
    }

    /// Map the legacy boolean pair onto a state. `needs_human` wins.
    pub fn from_legacy_flags(needs_human: bool, auto_ai_enabled: bool) -> Self {
        if needs_human {
            ConversationState::AwaitingHuman
        } else if !auto_ai_enabled {
            ConversationState::HumanHandling
        } else {
            ConversationState::AiHandling
        }
    }

    pub fn initial(auto_ai_default: bool) -> Self {
        if auto_ai_default {
            ConversationState::AiHandling
        } else {
            ConversationState::HumanHandling
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::AiHandling => "AI_HANDLING",
            ConversationState::AwaitingHuman => "AWAITING_HUMAN",
            ConversationState::HumanHandling => "HUMAN_HANDLING",
        }
    }

    pub fn needs_human(&self) -> bool {
        matches!(self, ConversationState::AwaitingHuman)
    }

    pub fn auto_ai_enabled(&self) -> bool {
        matches!(self, ConversationState::AiHandling)
    }
}

impl std::str::FromStr for ConversationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AI_HANDLING" => Ok(ConversationState::AiHandling),
            "AWAITING_HUMAN" => Ok(ConversationState::AwaitingHuman),
            "HUMAN_HANDLING" => Ok(ConversationState::HumanHandling),
            other => Err(format!("unknown conversation state: {}", other)),
        }
    }
}
