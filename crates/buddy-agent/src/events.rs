//! Turn event types

use crate::tool::ToolError;
use serde::{Deserialize, Serialize};

/// Events emitted while a turn runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of model text
    TextChunk { text: String },

    /// A tool call is about to be dispatched
    ToolCallStarted {
        name: String,
        args: serde_json::Value,
    },

    /// A tool call finished, successfully or not
    ToolCallFinished {
        name: String,
        output: String,
        error: Option<ToolError>,
    },

    /// The turn failed
    TurnError { error: String },

    /// The turn finished with its final reply
    TurnComplete { final_text: String },
}

impl StreamEvent {
    /// Check if this event ends the turn
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::TurnComplete { .. } | StreamEvent::TurnError { .. }
        )
    }
}
