//! Conversation engine: one user turn, end to end
//!
//! A turn sends the user's input, pulls chunks off the model stream, runs any
//! requested tools through the [`ToolDispatcher`] and feeds their results
//! back, until the model stops, the advance budget runs out or the turn
//! deadline passes. Every step is reported on the turn's [`TurnSender`].

use crate::bridge::TurnSender;
use crate::conversation::{ConversationTurn, to_contents};
use crate::error::Result;
use crate::events::StreamEvent;
use crate::tool::{ToolCallResult, ToolDispatcher};
use buddy_ai::{ChunkStream, ModelClient, Part};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

/// Upper bound on pulls from the model stream per turn
pub const DEFAULT_MAX_STREAM_ADVANCES: usize = 15;

/// Wall-clock budget for a whole turn, tool round-trips included
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(120);

/// Stand-in deadline for timeouts too large to add to the clock
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Reply used when a turn produced no text at all
pub const FALLBACK_REPLY: &str = "The model finished its work without providing a direct response.";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum stream-advance operations per turn. This counts pulls, not
    /// tool calls: a tool round-trip that drains several chunks uses several.
    pub max_stream_advances: usize,
    /// Deadline for the whole turn
    pub turn_timeout: Duration,
    /// Sent once, when a session starts from empty history
    pub system_instruction: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_stream_advances: DEFAULT_MAX_STREAM_ADVANCES,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            system_instruction: None,
        }
    }
}

/// Runs turns against a model with a set of local tools
pub struct ConversationEngine {
    client: Arc<dyn ModelClient>,
    dispatcher: Arc<dyn ToolDispatcher>,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(
        client: Arc<dyn ModelClient>,
        dispatcher: Arc<dyn ToolDispatcher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            client,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Run one turn and return the model's reply.
    ///
    /// The last event sent is always `TurnComplete` on success or
    /// `TurnError` on a transport failure.
    pub async fn run(
        &self,
        history: &[ConversationTurn],
        input: &str,
        events: &TurnSender,
    ) -> Result<String> {
        match self.drive(history, input, events).await {
            Ok(reply) => {
                events
                    .emit(StreamEvent::TurnComplete {
                        final_text: reply.clone(),
                    })
                    .await;
                Ok(reply)
            }
            Err(e) => {
                tracing::error!("Turn failed: {}", e);
                events
                    .emit(StreamEvent::TurnError {
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        history: &[ConversationTurn],
        input: &str,
        events: &TurnSender,
    ) -> Result<String> {
        let deadline = turn_deadline(Instant::now(), self.config.turn_timeout);
        let system_instruction = if history.is_empty() {
            self.config.system_instruction.clone()
        } else {
            None
        };

        tracing::debug!(
            model = self.client.model_name(),
            history = history.len(),
            "Starting turn"
        );
        let mut chat = self
            .client
            .start_chat(to_contents(history), system_instruction);
        let mut reply = ReplyBuffer::default();

        let mut stream: ChunkStream =
            match timeout_at(deadline, chat.send_message_stream(vec![Part::text(input)])).await {
                Ok(stream) => stream?,
                Err(_) => {
                    tracing::warn!("Turn deadline passed before the model answered");
                    return Ok(reply.finish());
                }
            };

        let mut advances = 0;
        loop {
            if advances >= self.config.max_stream_advances {
                tracing::warn!(advances, "Stream advance limit reached, truncating turn");
                break;
            }
            advances += 1;

            let next = match timeout_at(deadline, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!("Turn deadline passed while reading the model stream");
                    break;
                }
            };
            let chunk = match next {
                None => break,
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(chunk)) => chunk,
            };

            let mut responses = Vec::new();
            for part in chunk.parts {
                match part {
                    Part::Text { text } => {
                        if let Some(text) = reply.push(text) {
                            events.emit(StreamEvent::TextChunk { text }).await;
                        }
                    }
                    Part::FunctionCall { name, args } => {
                        events
                            .emit(StreamEvent::ToolCallStarted {
                                name: name.clone(),
                                args: args.clone(),
                            })
                            .await;

                        let result = match timeout_at(
                            deadline,
                            self.dispatcher.execute(&name, args),
                        )
                        .await
                        {
                            Ok(result) => ToolCallResult::from(result),
                            Err(_) => {
                                tracing::warn!(tool = %name, "Turn deadline passed during tool execution");
                                return Ok(reply.finish());
                            }
                        };
                        if let Some(error) = &result.error {
                            tracing::debug!(tool = %name, "Tool call failed: {}", error);
                        }

                        events
                            .emit(StreamEvent::ToolCallFinished {
                                name: name.clone(),
                                output: result.output.clone(),
                                error: result.error.clone(),
                            })
                            .await;
                        responses.push(Part::function_response(name, result.to_response()));
                    }
                    Part::FunctionResponse { .. } => {}
                }
            }

            if !responses.is_empty() {
                stream = match timeout_at(deadline, chat.send_message_stream(responses)).await {
                    Ok(stream) => stream?,
                    Err(_) => {
                        tracing::warn!("Turn deadline passed while sending tool results");
                        break;
                    }
                };
            }
        }

        Ok(reply.finish())
    }
}

/// `now + timeout`, saturating to a far-future instant on overflow
fn turn_deadline(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Accumulated reply text with consecutive-duplicate suppression for display
#[derive(Debug, Default)]
struct ReplyBuffer {
    text: String,
    last_chunk: Option<String>,
}

impl ReplyBuffer {
    /// Append a fragment; returns it when it should be shown
    fn push(&mut self, fragment: String) -> Option<String> {
        if fragment.is_empty() {
            return None;
        }
        self.text.push_str(&fragment);
        if self.last_chunk.as_deref() == Some(fragment.as_str()) {
            return None;
        }
        self.last_chunk = Some(fragment.clone());
        Some(fragment)
    }

    fn finish(self) -> String {
        if self.text.is_empty() {
            FALLBACK_REPLY.to_string()
        } else {
            self.text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{TurnReceiver, channel, spawn_turn};
    use crate::tool::ToolError;
    use async_trait::async_trait;
    use buddy_ai::{ChatSession, Content, FunctionDeclaration, StreamChunk};
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Script = Vec<buddy_ai::Result<StreamChunk>>;

    /// Model that answers each send with the next scripted stream
    #[derive(Default)]
    struct ScriptedModel {
        scripts: Arc<Mutex<VecDeque<Script>>>,
        starts: Arc<Mutex<Vec<(usize, Option<String>)>>>,
        sends: Arc<Mutex<Vec<Vec<Part>>>>,
    }

    impl ScriptedModel {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Arc::new(Mutex::new(scripts.into())),
                ..Default::default()
            }
        }
    }

    struct ScriptedChat {
        scripts: Arc<Mutex<VecDeque<Script>>>,
        sends: Arc<Mutex<Vec<Vec<Part>>>>,
    }

    #[async_trait]
    impl ChatSession for ScriptedChat {
        async fn send_message_stream(&mut self, parts: Vec<Part>) -> buddy_ai::Result<ChunkStream> {
            self.sends.lock().push(parts);
            let script = self.scripts.lock().pop_front().unwrap_or_default();
            Ok(Box::pin(futures::stream::iter(script)))
        }
    }

    impl ModelClient for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted"
        }

        fn start_chat(
            &self,
            history: Vec<Content>,
            system_instruction: Option<String>,
        ) -> Box<dyn ChatSession> {
            self.starts.lock().push((history.len(), system_instruction));
            Box::new(ScriptedChat {
                scripts: self.scripts.clone(),
                sends: self.sends.clone(),
            })
        }
    }

    /// Model that requests a tool call on every stream it opens
    #[derive(Default)]
    struct LoopingModel {
        pulls: Arc<AtomicUsize>,
    }

    struct LoopingChat {
        pulls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChatSession for LoopingChat {
        async fn send_message_stream(&mut self, _parts: Vec<Part>) -> buddy_ai::Result<ChunkStream> {
            let pulls = self.pulls.clone();
            Ok(Box::pin(async_stream::stream! {
                loop {
                    pulls.fetch_add(1, Ordering::SeqCst);
                    yield Ok::<_, buddy_ai::Error>(StreamChunk::function_call(
                        "list_files",
                        json!({"path": "."}),
                    ));
                }
            }))
        }
    }

    impl ModelClient for LoopingModel {
        fn model_name(&self) -> &str {
            "looping"
        }

        fn start_chat(&self, _history: Vec<Content>, _system: Option<String>) -> Box<dyn ChatSession> {
            Box::new(LoopingChat {
                pulls: self.pulls.clone(),
            })
        }
    }

    /// Model whose stream yields one text chunk and then never ends.
    /// With `slow_send`, opening the stream itself takes ten minutes.
    #[derive(Default)]
    struct StallingModel {
        slow_send: bool,
    }

    struct StallingChat {
        slow_send: bool,
    }

    #[async_trait]
    impl ChatSession for StallingChat {
        async fn send_message_stream(&mut self, _parts: Vec<Part>) -> buddy_ai::Result<ChunkStream> {
            if self.slow_send {
                tokio::time::sleep(Duration::from_secs(600)).await;
            }
            let first = futures::stream::iter(vec![Ok::<_, buddy_ai::Error>(StreamChunk::text(
                "partial",
            ))]);
            Ok(Box::pin(
                first.chain(futures::stream::pending::<buddy_ai::Result<StreamChunk>>()),
            ))
        }
    }

    impl ModelClient for StallingModel {
        fn model_name(&self) -> &str {
            "stalling"
        }

        fn start_chat(&self, _history: Vec<Content>, _system: Option<String>) -> Box<dyn ChatSession> {
            Box::new(StallingChat {
                slow_send: self.slow_send,
            })
        }
    }

    fn engine_with_timeout(model: Arc<dyn ModelClient>, timeout: Duration) -> ConversationEngine {
        ConversationEngine::new(
            model,
            Arc::new(FakeTools::default()),
            EngineConfig {
                turn_timeout: timeout,
                ..Default::default()
            },
        )
    }

    /// Dispatcher that knows `list_files` and `fail`, recording every call
    #[derive(Default)]
    struct FakeTools {
        calls: Mutex<Vec<(String, Value)>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl ToolDispatcher for FakeTools {
        fn declarations(&self) -> Vec<FunctionDeclaration> {
            Vec::new()
        }

        async fn execute(&self, name: &str, args: Value) -> std::result::Result<String, ToolError> {
            self.calls.lock().push((name.to_string(), args));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match name {
                "list_files" => Ok("a.txt\nb.txt".to_string()),
                "fail" => Err(ToolError::execution("disk full")),
                other => Err(ToolError::UnknownTool {
                    name: other.to_string(),
                }),
            }
        }
    }

    async fn collect(mut rx: TurnReceiver) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    async fn run_turn(
        engine: &ConversationEngine,
        history: &[ConversationTurn],
        input: &str,
    ) -> (Result<String>, Vec<StreamEvent>) {
        let (tx, rx) = channel();
        tokio::join!(engine.run(history, input, &tx), collect(rx))
    }

    fn engine_with(model: Arc<dyn ModelClient>, tools: Arc<FakeTools>) -> ConversationEngine {
        ConversationEngine::new(
            model,
            tools,
            EngineConfig {
                system_instruction: Some("be helpful".into()),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_tool_round_trip_event_sequence() {
        let model = Arc::new(ScriptedModel::new(vec![
            vec![Ok(StreamChunk::function_call(
                "list_files",
                json!({"path": "."}),
            ))],
            vec![Ok(StreamChunk::text("Done."))],
        ]));
        let tools = Arc::new(FakeTools::default());
        let engine = engine_with(model.clone(), tools.clone());

        let (result, events) = run_turn(&engine, &[], "list my files").await;

        assert_eq!(result.unwrap(), "Done.");
        assert_eq!(
            events,
            vec![
                StreamEvent::ToolCallStarted {
                    name: "list_files".into(),
                    args: json!({"path": "."}),
                },
                StreamEvent::ToolCallFinished {
                    name: "list_files".into(),
                    output: "a.txt\nb.txt".into(),
                    error: None,
                },
                StreamEvent::TextChunk {
                    text: "Done.".into()
                },
                StreamEvent::TurnComplete {
                    final_text: "Done.".into()
                },
            ]
        );

        let sends = model.sends.lock();
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0], vec![Part::text("list my files")]);
        assert_eq!(
            sends[1],
            vec![Part::function_response(
                "list_files",
                json!({"output": "a.txt\nb.txt"})
            )]
        );
        assert_eq!(tools.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_system_instruction_only_for_fresh_session() {
        let model = Arc::new(ScriptedModel::new(vec![
            vec![Ok(StreamChunk::text("one"))],
            vec![Ok(StreamChunk::text("two"))],
        ]));
        let engine = engine_with(model.clone(), Arc::new(FakeTools::default()));

        let (first, _) = run_turn(&engine, &[], "hi").await;
        let history = vec![
            ConversationTurn::user("hi"),
            ConversationTurn::model(first.unwrap()),
        ];
        let (second, _) = run_turn(&engine, &history, "again").await;
        assert_eq!(second.unwrap(), "two");

        let starts = model.starts.lock();
        assert_eq!(starts[0], (0, Some("be helpful".to_string())));
        assert_eq!(starts[1], (2, None));
    }

    #[tokio::test]
    async fn test_transport_error_ends_turn_with_turn_error() {
        let model = Arc::new(ScriptedModel::new(vec![vec![
            Ok(StreamChunk::text("partial")),
            Err(buddy_ai::Error::Sse("connection reset".into())),
        ]]));
        let engine = engine_with(model, Arc::new(FakeTools::default()));

        let (result, events) = run_turn(&engine, &[], "hi").await;

        assert!(result.is_err());
        assert_eq!(events.len(), 2);
        match events.last() {
            Some(StreamEvent::TurnError { error }) => {
                assert!(error.contains("connection reset"), "got: {}", error)
            }
            other => panic!("expected TurnError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_error_is_folded_into_response() {
        let model = Arc::new(ScriptedModel::new(vec![
            vec![Ok(StreamChunk::function_call("fail", json!({})))],
            vec![Ok(StreamChunk::text("That failed."))],
        ]));
        let engine = engine_with(model.clone(), Arc::new(FakeTools::default()));

        let (result, events) = run_turn(&engine, &[], "try it").await;

        assert_eq!(result.unwrap(), "That failed.");
        assert!(events.contains(&StreamEvent::ToolCallFinished {
            name: "fail".into(),
            output: String::new(),
            error: Some(ToolError::execution("disk full")),
        }));
        assert_eq!(
            model.sends.lock()[1],
            vec![Part::function_response(
                "fail",
                json!({"output": "", "error": "disk full"})
            )]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_reaches_model_as_error() {
        let model = Arc::new(ScriptedModel::new(vec![
            vec![Ok(StreamChunk::function_call("bogus_tool", json!({})))],
            vec![Ok(StreamChunk::text("Sorry."))],
        ]));
        let engine = engine_with(model.clone(), Arc::new(FakeTools::default()));

        let (result, _) = run_turn(&engine, &[], "do it").await;

        assert_eq!(result.unwrap(), "Sorry.");
        let sends = model.sends.lock();
        match &sends[1][0] {
            Part::FunctionResponse { name, response } => {
                assert_eq!(name, "bogus_tool");
                assert_eq!(response["error"], "unknown tool: bogus_tool");
            }
            other => panic!("expected function response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_chunks_are_shown_once_but_kept() {
        let model = Arc::new(ScriptedModel::new(vec![vec![
            Ok(StreamChunk::text("a")),
            Ok(StreamChunk::text("a")),
            Ok(StreamChunk::text("")),
            Ok(StreamChunk::text("b")),
        ]]));
        let engine = engine_with(model, Arc::new(FakeTools::default()));

        let (result, events) = run_turn(&engine, &[], "hi").await;

        assert_eq!(result.unwrap(), "aab");
        let chunks: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextChunk { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(chunks, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_tool_only_turn_gets_fallback_reply() {
        let model = Arc::new(ScriptedModel::new(vec![vec![Ok(
            StreamChunk::function_call("list_files", json!({"path": "."})),
        )]]));
        let engine = engine_with(model, Arc::new(FakeTools::default()));

        let (result, events) = run_turn(&engine, &[], "hi").await;

        assert_eq!(result.unwrap(), FALLBACK_REPLY);
        assert_eq!(
            events.last(),
            Some(&StreamEvent::TurnComplete {
                final_text: FALLBACK_REPLY.into()
            })
        );
    }

    #[tokio::test]
    async fn test_advance_limit_stops_endless_tool_calls() {
        let model = Arc::new(LoopingModel::default());
        let tools = Arc::new(FakeTools::default());
        let engine = engine_with(model.clone(), tools.clone());

        let (result, events) = run_turn(&engine, &[], "loop forever").await;

        assert_eq!(result.unwrap(), FALLBACK_REPLY);
        assert_eq!(
            model.pulls.load(Ordering::SeqCst),
            DEFAULT_MAX_STREAM_ADVANCES
        );
        assert_eq!(tools.calls.lock().len(), DEFAULT_MAX_STREAM_ADVANCES);
        assert!(matches!(
            events.last(),
            Some(StreamEvent::TurnComplete { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_truncates_slow_tool() {
        let model = Arc::new(ScriptedModel::new(vec![vec![
            Ok(StreamChunk::text("Working on it")),
            Ok(StreamChunk::function_call("list_files", json!({"path": "."}))),
        ]]));
        let tools = Arc::new(FakeTools {
            delay: Some(Duration::from_secs(600)),
            ..Default::default()
        });
        let engine = ConversationEngine::new(
            model,
            tools,
            EngineConfig {
                turn_timeout: Duration::from_secs(5),
                ..Default::default()
            },
        );

        let started = Instant::now();
        let (result, events) = run_turn(&engine, &[], "slow").await;

        assert_eq!(result.unwrap(), "Working on it");
        assert!(started.elapsed() < Duration::from_secs(6));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, StreamEvent::TurnError { .. }))
        );
        assert_eq!(
            events.last(),
            Some(&StreamEvent::TurnComplete {
                final_text: "Working on it".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_truncates_stalled_stream() {
        let engine = engine_with_timeout(
            Arc::new(StallingModel::default()),
            Duration::from_secs(5),
        );

        let started = Instant::now();
        let (result, events) = run_turn(&engine, &[], "hi").await;

        assert_eq!(result.unwrap(), "partial");
        assert!(started.elapsed() < Duration::from_secs(6));
        assert_eq!(
            events,
            vec![
                StreamEvent::TextChunk {
                    text: "partial".into()
                },
                StreamEvent::TurnComplete {
                    final_text: "partial".into()
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_before_first_chunk_gives_fallback() {
        let engine = engine_with_timeout(
            Arc::new(StallingModel { slow_send: true }),
            Duration::from_secs(5),
        );

        let (result, events) = run_turn(&engine, &[], "hi").await;

        assert_eq!(result.unwrap(), FALLBACK_REPLY);
        assert_eq!(
            events,
            vec![StreamEvent::TurnComplete {
                final_text: FALLBACK_REPLY.into()
            }]
        );
    }

    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow() {
        let model = Arc::new(ScriptedModel::new(vec![vec![Ok(StreamChunk::text("hi"))]]));
        let engine = engine_with_timeout(model, Duration::from_secs(u64::MAX));

        let (result, events) = run_turn(&engine, &[], "hello").await;

        assert_eq!(result.unwrap(), "hi");
        assert_eq!(
            events.last(),
            Some(&StreamEvent::TurnComplete {
                final_text: "hi".into()
            })
        );
    }

    #[tokio::test]
    async fn test_turn_deadline_saturates() {
        let now = Instant::now();
        assert_eq!(turn_deadline(now, Duration::from_secs(5)), now + Duration::from_secs(5));
        assert!(turn_deadline(now, Duration::MAX) > now + Duration::from_secs(86400));
    }

    #[tokio::test]
    async fn test_spawned_turn_streams_to_receiver() {
        let model = Arc::new(ScriptedModel::new(vec![vec![Ok(StreamChunk::text(
            "hello",
        ))]]));
        let engine = Arc::new(engine_with(model, Arc::new(FakeTools::default())));

        let events = collect(spawn_turn(engine, Vec::new(), "hi".into())).await;

        assert_eq!(
            events,
            vec![
                StreamEvent::TextChunk {
                    text: "hello".into()
                },
                StreamEvent::TurnComplete {
                    final_text: "hello".into()
                },
            ]
        );
    }

    #[test]
    fn test_reply_buffer() {
        let mut buffer = ReplyBuffer::default();
        assert_eq!(buffer.push("x".into()), Some("x".to_string()));
        assert_eq!(buffer.push("x".into()), None);
        assert_eq!(buffer.push("y".into()), Some("y".to_string()));
        assert_eq!(buffer.push("x".into()), Some("x".to_string()));
        assert_eq!(buffer.finish(), "xxyx");
        assert_eq!(ReplyBuffer::default().finish(), FALLBACK_REPLY);
    }
}
