//! Model client seam
//!
//! A [`ModelClient`] opens chat sessions; a [`ChatSession`] keeps the running
//! exchange and turns each outgoing message into a [`ChunkStream`]. Sending a
//! new message replaces the previous stream: whatever the model produced on
//! the old stream becomes part of the session history first.

use crate::error::Result;
use crate::stream::ChunkStream;
use crate::types::{Content, Part};
use async_trait::async_trait;

/// A live chat exchange with the model
#[async_trait]
pub trait ChatSession: Send {
    /// Send user text or tool responses and stream the model's reply
    async fn send_message_stream(&mut self, parts: Vec<Part>) -> Result<ChunkStream>;
}

/// Factory for chat sessions
pub trait ModelClient: Send + Sync {
    /// Model identifier used for display and logging
    fn model_name(&self) -> &str;

    /// Start a session seeded with prior turns.
    ///
    /// `system_instruction` is attached to the session once, at creation.
    fn start_chat(
        &self,
        history: Vec<Content>,
        system_instruction: Option<String>,
    ) -> Box<dyn ChatSession>;
}
