//! Per-turn event channel between the engine task and the UI loop
//!
//! The engine is the only producer and the UI the only consumer. The channel
//! holds a single event, so the engine waits on every emit until the UI has
//! taken the previous one. Dropping the sender closes the channel; if that
//! happens before a terminal event arrives, the receiver reports an implicit
//! `TurnComplete` built from the text it has seen.

use crate::conversation::ConversationTurn;
use crate::engine::{ConversationEngine, FALLBACK_REPLY};
use crate::events::StreamEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Number of events the bridge buffers
pub const BRIDGE_CAPACITY: usize = 1;

/// Create a connected sender/receiver pair for one turn
pub fn channel() -> (TurnSender, TurnReceiver) {
    let (tx, rx) = mpsc::channel(BRIDGE_CAPACITY);
    (
        TurnSender { tx },
        TurnReceiver {
            rx,
            seen_text: String::new(),
            finished: false,
        },
    )
}

/// Producer end, owned by the engine task
#[derive(Debug)]
pub struct TurnSender {
    tx: mpsc::Sender<StreamEvent>,
}

impl TurnSender {
    /// Send an event, waiting for room. Returns false if the consumer is gone.
    pub async fn emit(&self, event: StreamEvent) -> bool {
        match self.tx.send(event).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                tracing::debug!(?event, "bridge consumer dropped, event discarded");
                false
            }
        }
    }
}

/// Consumer end, owned by the UI loop
#[derive(Debug)]
pub struct TurnReceiver {
    rx: mpsc::Receiver<StreamEvent>,
    seen_text: String,
    finished: bool,
}

impl TurnReceiver {
    /// Next event of the turn; `None` once the turn has ended
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }

        match self.rx.recv().await {
            Some(event) => {
                if let StreamEvent::TextChunk { text } = &event {
                    self.seen_text.push_str(text);
                }
                if event.is_terminal() {
                    self.finished = true;
                    self.rx.close();
                }
                Some(event)
            }
            None => {
                tracing::warn!("turn channel closed without a terminal event");
                self.finished = true;
                let final_text = if self.seen_text.is_empty() {
                    FALLBACK_REPLY.to_string()
                } else {
                    std::mem::take(&mut self.seen_text)
                };
                Some(StreamEvent::TurnComplete { final_text })
            }
        }
    }

    /// Whether the terminal event has been delivered
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Run one turn on a background task and return the consumer end.
///
/// The engine gets its own copy of the history; the caller keeps ownership
/// of the original.
pub fn spawn_turn(
    engine: Arc<ConversationEngine>,
    history: Vec<ConversationTurn>,
    input: String,
) -> TurnReceiver {
    let (tx, rx) = channel();
    tokio::spawn(async move {
        if let Err(e) = engine.run(&history, &input, &tx).await {
            tracing::debug!("turn ended with error: {}", e);
        }
        // tx drops here, closing the channel
    });
    rx
}
