//! Google Generative AI (Gemini) streaming chat provider

use crate::{
    client::{ChatSession, ModelClient},
    error::{Error, Result},
    stream::{ChunkStream, StreamChunk},
    types::{Content, FunctionDeclaration, Part, Role, merge_parts},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default Gemini REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini client; every chat it starts shares the HTTP client and tool list
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    tools: Arc<Vec<FunctionDeclaration>>,
}

impl GeminiClient {
    /// Create a client for `model` with an API key
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tools: Arc::new(Vec::new()),
        }
    }

    /// Override the REST endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Declare the tools the model may call
    pub fn with_tools(mut self, tools: Vec<FunctionDeclaration>) -> Self {
        self.tools = Arc::new(tools);
        self
    }
}

impl ModelClient for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn start_chat(
        &self,
        history: Vec<Content>,
        system_instruction: Option<String>,
    ) -> Box<dyn ChatSession> {
        Box::new(GeminiChat {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            url: format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, self.model
            ),
            tools: Arc::clone(&self.tools),
            system_instruction,
            contents: history,
            pending: Arc::new(Mutex::new(Vec::new())),
        })
    }
}

/// One Gemini chat exchange
pub struct GeminiChat {
    client: reqwest::Client,
    api_key: String,
    url: String,
    tools: Arc<Vec<FunctionDeclaration>>,
    system_instruction: Option<String>,
    contents: Vec<Content>,
    /// Model parts received on the current stream, not yet in `contents`
    pending: Arc<Mutex<Vec<Part>>>,
}

impl GeminiChat {
    /// Move the parts streamed so far into history as a model turn
    fn commit_pending(&mut self) {
        let parts = std::mem::take(&mut *self.pending.lock());
        if !parts.is_empty() {
            self.contents.push(Content::new(Role::Model, parts));
        }
    }

    fn build_request(&self) -> GeminiRequest {
        let contents = self.contents.iter().map(convert_content).collect();

        let system_instruction = self
            .system_instruction
            .as_ref()
            .map(|prompt| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: prompt.clone(),
                }],
            });

        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: self
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: Some(t.parameters.clone()),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
        }
    }
}

#[async_trait]
impl ChatSession for GeminiChat {
    async fn send_message_stream(&mut self, parts: Vec<Part>) -> Result<ChunkStream> {
        self.commit_pending();
        self.contents.push(Content::new(Role::User, parts));

        let request = self.build_request();
        tracing::debug!(
            url = %self.url,
            contents = request.contents.len(),
            "sending gemini request"
        );

        let request_builder = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(
            event_source,
            Arc::clone(&self.pending),
        )))
    }
}

fn convert_content(content: &Content) -> GeminiContent {
    let parts = content
        .parts
        .iter()
        .map(|part| match part {
            Part::Text { text } => GeminiPart::Text { text: text.clone() },
            Part::FunctionCall { name, args } => GeminiPart::FunctionCall {
                function_call: GeminiFunctionCall {
                    name: name.clone(),
                    args: args.clone(),
                },
            },
            Part::FunctionResponse { name, response } => GeminiPart::FunctionResponse {
                function_response: GeminiFunctionResponse {
                    name: name.clone(),
                    response: response.clone(),
                },
            },
        })
        .collect();

    GeminiContent {
        role: Some(content.role.as_str().to_string()),
        parts,
    }
}

fn create_stream(
    mut event_source: EventSource,
    pending: Arc<Mutex<Vec<Part>>>,
) -> impl futures::Stream<Item = Result<StreamChunk>> {
    stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.is_empty() || msg.data == "[DONE]" {
                        continue;
                    }

                    match parse_chunk(&msg.data) {
                        Ok(chunk) => {
                            merge_parts(&mut pending.lock(), chunk.parts.iter().cloned());
                            yield Ok(chunk);
                        }
                        Err(e) => {
                            event_source.close();
                            yield Err(e);
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::Transport(e)) => {
                    event_source.close();
                    yield Err(Error::Http(e));
                    return;
                }
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    event_source.close();
                    let body = response.text().await.unwrap_or_default();
                    let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                        .map(|e| e.error.message)
                        .unwrap_or(body);
                    yield Err(Error::from_status(status.as_u16(), message));
                    return;
                }
                Err(e) => {
                    event_source.close();
                    yield Err(Error::Sse(e.to_string()));
                    return;
                }
            }
        }
        // EventSource reconnects unless told otherwise
        event_source.close();
    }
}

/// Decode one SSE data frame into the text and tool-call parts of the first candidate
fn parse_chunk(data: &str) -> Result<StreamChunk> {
    if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(data) {
        return Err(Error::api(
            error_response
                .error
                .status
                .unwrap_or_else(|| "error".to_string()),
            error_response.error.message,
        ));
    }

    let response: GeminiStreamResponse = serde_json::from_str(data)?;

    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    GeminiResponsePart::Text { text } => Some(Part::Text { text }),
                    GeminiResponsePart::FunctionCall { function_call } => {
                        Some(Part::FunctionCall {
                            name: function_call.name,
                            args: function_call.args,
                        })
                    }
                    GeminiResponsePart::Other(_) => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(StreamChunk { parts })
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCall {
    name: String,
    args: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiResponsePart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiResponseFunctionCall,
    },
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
struct GeminiResponseFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chat(system_instruction: Option<&str>, history: Vec<Content>) -> GeminiChat {
        GeminiChat {
            client: reqwest::Client::new(),
            api_key: "test".into(),
            url: "http://localhost/models/test:streamGenerateContent?alt=sse".into(),
            tools: Arc::new(vec![FunctionDeclaration {
                name: "list_files".into(),
                description: "List files".into(),
                parameters: json!({"type": "object"}),
            }]),
            system_instruction: system_instruction.map(String::from),
            contents: history,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[test]
    fn test_request_includes_system_instruction_only_when_set() {
        let with = serde_json::to_value(chat(Some("be brief"), vec![]).build_request()).unwrap();
        assert_eq!(with["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(with["systemInstruction"].get("role").is_none());

        let without = serde_json::to_value(chat(None, vec![]).build_request()).unwrap();
        assert!(without.get("systemInstruction").is_none());
    }

    #[test]
    fn test_request_serializes_tools_and_roles() {
        let history = vec![Content::user_text("hi"), Content::model_text("hello")];
        let value = serde_json::to_value(chat(None, history).build_request()).unwrap();

        assert_eq!(
            value["tools"][0]["functionDeclarations"][0]["name"],
            "list_files"
        );
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["contents"][1]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_function_response_wire_shape() {
        let content = Content::new(
            Role::User,
            vec![Part::function_response(
                "read_file",
                json!({"output": "contents"}),
            )],
        );
        let value = serde_json::to_value(convert_content(&content)).unwrap();
        assert_eq!(value["parts"][0]["functionResponse"]["name"], "read_file");
        assert_eq!(
            value["parts"][0]["functionResponse"]["response"]["output"],
            "contents"
        );
    }

    #[test]
    fn test_commit_pending_adds_model_turn() {
        let mut chat = chat(None, vec![Content::user_text("list")]);
        merge_parts(
            &mut chat.pending.lock(),
            vec![
                Part::text("Let me "),
                Part::text("look."),
                Part::function_call("list_files", json!({"path": "."})),
            ],
        );

        chat.commit_pending();

        assert_eq!(chat.contents.len(), 2);
        assert_eq!(chat.contents[1].role, Role::Model);
        assert_eq!(chat.contents[1].parts.len(), 2);
        assert_eq!(chat.contents[1].text(), "Let me look.");
        assert!(chat.pending.lock().is_empty());

        // Nothing pending: no empty model turn
        chat.commit_pending();
        assert_eq!(chat.contents.len(), 2);
    }

    #[test]
    fn test_parse_chunk_text_and_call() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[
            {"text":"Checking"},
            {"functionCall":{"name":"list_files","args":{"path":"."}}}
        ]}}]}"#;
        let chunk = parse_chunk(data).unwrap();
        assert_eq!(chunk.parts.len(), 2);
        assert_eq!(chunk.parts[0].as_text(), Some("Checking"));
        assert_eq!(
            chunk.parts[1],
            Part::function_call("list_files", json!({"path": "."}))
        );
    }

    #[test]
    fn test_parse_chunk_without_candidates_is_empty() {
        let chunk = parse_chunk(r#"{"usageMetadata":{"promptTokenCount":3}}"#).unwrap();
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_parse_chunk_skips_unknown_parts() {
        let data = r#"{"candidates":[{"content":{"parts":[{"thoughtSignature":"abc"},{"text":"ok"}]}}]}"#;
        let chunk = parse_chunk(data).unwrap();
        assert_eq!(chunk.parts, vec![Part::text("ok")]);
    }

    #[test]
    fn test_parse_chunk_error_frame() {
        let data = r#"{"error":{"code":400,"message":"bad key","status":"INVALID_ARGUMENT"}}"#;
        match parse_chunk(data) {
            Err(Error::Api {
                error_type,
                message,
            }) => {
                assert_eq!(error_type, "INVALID_ARGUMENT");
                assert_eq!(message, "bad key");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_chunk_garbage() {
        assert!(matches!(parse_chunk("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let client = GeminiClient::new("k", "gemini-2.5-flash").with_base_url("http://x/v1/");
        assert_eq!(client.base_url, "http://x/v1");
        assert_eq!(client.model_name(), "gemini-2.5-flash");
    }
}
