//! buddy-agent: tool-augmented conversation engine
//!
//! Runs one user turn against the model, dispatching tool calls locally and
//! streaming progress to the UI over a per-turn bridge channel.

pub mod bridge;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod events;
pub mod tool;

pub use bridge::{TurnReceiver, TurnSender, spawn_turn};
pub use conversation::ConversationTurn;
pub use engine::{ConversationEngine, EngineConfig, FALLBACK_REPLY};
pub use error::{Error, Result};
pub use events::StreamEvent;
pub use tool::{ArgumentValidator, ToolCallResult, ToolDispatcher, ToolError};
