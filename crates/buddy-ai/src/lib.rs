//! buddy-ai: language model client layer
//!
//! Defines the chat-session seam the conversation engine talks to and a
//! streaming Gemini implementation of it.

pub mod client;
pub mod error;
pub mod providers;
pub mod stream;
pub mod types;

pub use client::{ChatSession, ModelClient};
pub use error::{Error, Result};
pub use stream::{ChunkStream, StreamChunk};
pub use types::*;
