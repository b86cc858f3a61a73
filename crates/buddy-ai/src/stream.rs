//! Streaming response types

use crate::error::Result;
use crate::types::Part;
use futures::Stream;
use std::pin::Pin;

/// One item pulled from a model response stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    pub parts: Vec<Part>,
}

impl StreamChunk {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Chunk holding a single text fragment
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Part::text(text)])
    }

    /// Chunk holding a single tool call
    pub fn function_call(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self::new(vec![Part::function_call(name, args)])
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// A stream of response chunks; an `Err` item is a transport failure
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;
