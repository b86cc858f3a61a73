//! Model provider implementations

pub mod google;

pub use google::{GeminiChat, GeminiClient};
