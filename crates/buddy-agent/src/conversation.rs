//! Conversation history and its conversion to model turns

use buddy_ai::{Content, Role};
use serde::{Deserialize, Serialize};

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Pair history entries positionally as `(2i, 2i+1)` = (user, model).
///
/// Roles are not inspected. An odd-length history gets an empty model text
/// for its last pair.
pub fn pair_history(history: &[ConversationTurn]) -> Vec<(String, String)> {
    history
        .chunks(2)
        .map(|pair| {
            let user = pair[0].text.clone();
            let model = pair.get(1).map(|t| t.text.clone()).unwrap_or_default();
            (user, model)
        })
        .collect()
}

/// Convert history into alternating user/model contents
pub fn to_contents(history: &[ConversationTurn]) -> Vec<Content> {
    pair_history(history)
        .into_iter()
        .flat_map(|(user, model)| [Content::user_text(user), Content::model_text(model)])
        .collect()
}

/// Append a completed (input, reply) exchange
pub fn commit_turn(history: &mut Vec<ConversationTurn>, input: &str, reply: &str) {
    history.push(ConversationTurn::user(input));
    history.push(ConversationTurn::model(reply));
}
