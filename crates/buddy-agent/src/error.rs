//! Error types for buddy-agent

use thiserror::Error;

/// Result type alias using buddy-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that end a turn
#[derive(Error, Debug)]
pub enum Error {
    /// The model stream failed; fatal for the turn, never retried
    #[error(transparent)]
    Transport(#[from] buddy_ai::Error),
}
