//! HTTP client wrapper for the hosted agent framework.
//!
//! The framework exposes one run endpoint: the service sends a model id, an
//! input prompt, and optional agent configuration (instructions, tools,
//! knowledge collection, conversation storage), and receives either a single
//! JSON reply or a finite SSE stream of text fragments. The client hides the
//! shape of the upstream reply behind [`AgentReply`], which always carries a
//! text field, so handlers never branch on runtime structure.

use crate::config::get_config;
use async_stream::try_stream;
use futures_util::{Stream, StreamExt, pin_mut};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while talking to the agent framework.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Transport-level failure reported by reqwest.
    #[error("Agent request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The framework answered with a non-success status code.
    #[error("Agent API returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code of the response.
        status: StatusCode,
        /// Response body captured for diagnostics.
        body: String,
    },
    /// The configured base URL could not be parsed.
    #[error("Invalid agent API URL: {0}")]
    InvalidUrl(String),
}

/// Conversation storage binding forwarded to the framework.
///
/// The service never reads or writes history itself; it hands the framework a
/// table name and DSN and lets it persist exchanges keyed by `user_id`.
#[derive(Debug, Clone, Serialize)]
pub struct StorageBinding {
    /// Table holding serialized conversations.
    pub table: String,
    /// Database connection string.
    pub db_url: String,
}

/// Knowledge-base binding forwarded to the framework.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBinding {
    /// Vector collection scoped to the current document.
    pub collection: String,
    /// Database connection string backing the collection.
    pub db_url: String,
}

/// Parameters for a single agent run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Prompt or message handed to the agent.
    pub input: String,
    /// Agent instruction list, omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
    /// Tool identifiers the agent may call, omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Identifier the framework uses to key persisted history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// External conversation storage, enabled for `/ask` runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageBinding>,
    /// Document knowledge base the agent may search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<KnowledgeBinding>,
    /// Let the agent query the knowledge base while answering.
    pub search_knowledge: bool,
    /// Let the agent read prior exchanges for the user.
    pub read_chat_history: bool,
}

impl RunRequest {
    /// Build a minimal run with no tools, storage, or knowledge attached.
    pub fn new(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            instructions: Vec::new(),
            tools: Vec::new(),
            user_id: None,
            storage: None,
            knowledge: None,
            search_knowledge: false,
            read_chat_history: false,
        }
    }
}

#[derive(Serialize)]
struct RunBody<'a> {
    provider: &'static str,
    #[serde(flatten)]
    request: &'a RunRequest,
    stream: bool,
}

/// Model provider the framework is asked to route runs through.
const PROVIDER: &str = "groq";

/// Reply contract guaranteed by the client: always a text string, never a
/// shape the HTTP layer has to inspect.
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// Trimmed text content of the agent's reply. May be empty.
    pub text: String,
}

impl AgentReply {
    /// Extract reply text from the framework's heterogeneous response object.
    ///
    /// Tries a `content` field, then a `text` field, then falls back to a
    /// generic string rendering of the whole value.
    pub(crate) fn from_value(value: &Value) -> Self {
        let text = value
            .get("content")
            .and_then(Value::as_str)
            .or_else(|| value.get("text").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            });
        Self {
            text: text.trim().to_string(),
        }
    }
}

/// Lightweight HTTP client for agent runs.
pub struct AgentClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AgentClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, AgentError> {
        let config = get_config();
        let client = Client::builder().user_agent("docagent/0.2").build()?;
        let base_url = normalize_base_url(&config.agent_api_url).map_err(AgentError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized agent framework client");

        Ok(Self {
            client,
            base_url,
            api_key: config.groq_api_key.clone(),
        })
    }

    /// Execute a single synchronous run and return the reply text.
    pub async fn run(&self, request: &RunRequest) -> Result<AgentReply, AgentError> {
        let body = RunBody {
            provider: PROVIDER,
            request,
            stream: false,
        };
        let response = self
            .request(Method::POST, "v1/agent/runs")
            .json(&body)
            .send()
            .await?;
        let response =
            ensure_success(response, |status, body| AgentError::UnexpectedStatus {
                status,
                body,
            })
            .await?;
        let value: Value = response.json().await?;
        let reply = AgentReply::from_value(&value);
        tracing::debug!(model = %request.model, chars = reply.text.len(), "Agent run completed");
        Ok(reply)
    }

    /// Execute a streamed run and concatenate its fragments in arrival order.
    ///
    /// The framework terminates the stream with a `[DONE]` sentinel; fragments
    /// received before it are joined without separators, mirroring the
    /// non-streamed reply.
    pub async fn run_streamed(&self, request: &RunRequest) -> Result<String, AgentError> {
        let body = RunBody {
            provider: PROVIDER,
            request,
            stream: true,
        };
        let response = self
            .request(Method::POST, "v1/agent/runs")
            .json(&body)
            .send()
            .await?;
        let response =
            ensure_success(response, |status, body| AgentError::UnexpectedStatus {
                status,
                body,
            })
            .await?;

        let fragments = fragment_stream(response);
        pin_mut!(fragments);
        let mut full = String::new();
        while let Some(fragment) = fragments.next().await {
            full.push_str(&fragment?);
        }
        tracing::debug!(model = %request.model, chars = full.len(), "Agent stream completed");
        Ok(full)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client.request(method, url).bearer_auth(&self.api_key)
    }
}

/// Pass a successful response through, or capture the status and body into
/// the caller's error type. Shared by every upstream client in this crate.
pub(crate) async fn ensure_success<E, F>(
    response: reqwest::Response,
    build_error: F,
) -> Result<reqwest::Response, E>
where
    E: std::fmt::Display,
    F: FnOnce(StatusCode, String) -> E,
{
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = build_error(status, body);
        tracing::error!(error = %error, "Upstream request failed");
        Err(error)
    }
}

/// Turn an SSE response body into an ordered stream of text fragments.
///
/// Events are separated by blank lines; each carries one `data:` payload. The
/// stream ends at the `[DONE]` sentinel or when the body is exhausted.
fn fragment_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, AgentError>> {
    try_stream! {
        let mut events = EventBuffer::new();
        let mut done = false;
        let mut bytes = response.bytes_stream();
        while !done {
            let Some(chunk) = bytes.next().await else {
                break;
            };
            let chunk = chunk?;
            for event in events.push(&chunk) {
                match event {
                    SseEvent::Fragment(text) => yield text,
                    SseEvent::Done => {
                        done = true;
                        break;
                    }
                    SseEvent::Empty => {}
                }
            }
        }
        // Trailing event without a terminating blank line.
        if !done {
            if let SseEvent::Fragment(text) = events.finish() {
                yield text;
            }
        }
    }
}

/// Byte-accurate accumulator for SSE event framing.
///
/// Network chunks can split a multi-byte UTF-8 character, so bytes are
/// buffered raw and decoded only once a complete event (terminated by a blank
/// line) is available.
struct EventBuffer {
    buffer: Vec<u8>,
}

impl EventBuffer {
    fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Append raw bytes and parse every complete event they finish.
    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(boundary) = self
            .buffer
            .windows(2)
            .position(|pair| pair == b"\n\n")
        {
            let event = String::from_utf8_lossy(&self.buffer[..boundary]).into_owned();
            self.buffer.drain(..boundary + 2);
            events.push(parse_event(&event));
        }
        events
    }

    /// Parse whatever remains after the body ends without a blank line.
    fn finish(self) -> SseEvent {
        parse_event(&String::from_utf8_lossy(&self.buffer))
    }
}

#[derive(Debug)]
enum SseEvent {
    Fragment(String),
    Done,
    Empty,
}

fn parse_event(event: &str) -> SseEvent {
    for line in event.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == "[DONE]" {
            return SseEvent::Done;
        }
        return SseEvent::Fragment(fragment_text(data));
    }
    SseEvent::Empty
}

/// Decode one fragment payload.
///
/// Payloads are normally JSON objects with a `delta` string, but the original
/// framework also emitted bare strings; anything else passes through verbatim.
fn fragment_text(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(value) => {
            if let Some(delta) = value.get("delta").and_then(Value::as_str) {
                delta.to_string()
            } else if let Value::String(text) = value {
                text
            } else {
                data.to_string()
            }
        }
        Err(_) => data.to_string(),
    }
}

/// Validate a base URL and strip any trailing slash from its path.
pub(crate) fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

/// Join a base URL and an endpoint path with exactly one slash.
pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::{AgentReply, EventBuffer, SseEvent, fragment_text, parse_event};
    use serde_json::json;

    #[test]
    fn reply_prefers_content_field() {
        let reply = AgentReply::from_value(&json!({
            "content": "From content",
            "text": "From text"
        }));
        assert_eq!(reply.text, "From content");
    }

    #[test]
    fn reply_falls_back_to_text_field() {
        let reply = AgentReply::from_value(&json!({ "text": "  From text  " }));
        assert_eq!(reply.text, "From text");
    }

    #[test]
    fn reply_renders_unknown_shapes_as_strings() {
        let reply = AgentReply::from_value(&json!("bare string"));
        assert_eq!(reply.text, "bare string");

        let reply = AgentReply::from_value(&json!({ "tokens": 3 }));
        assert_eq!(reply.text, "{\"tokens\":3}");
    }

    #[test]
    fn event_parsing_extracts_delta_payloads() {
        match parse_event("data: {\"delta\": \"Hello\"}") {
            SseEvent::Fragment(text) => assert_eq!(text, "Hello"),
            _ => panic!("expected fragment"),
        }
    }

    #[test]
    fn event_parsing_recognizes_done_sentinel() {
        assert!(matches!(parse_event("data: [DONE]"), SseEvent::Done));
        assert!(matches!(parse_event(": keep-alive"), SseEvent::Empty));
    }

    #[test]
    fn event_buffer_preserves_multibyte_chars_split_across_chunks() {
        let payload = "data: {\"delta\": \"héllo\"}\n\n".as_bytes();
        // Split in the middle of the two-byte 'é' (0xC3 | 0xA9).
        let (first, second) = payload.split_at(19);
        assert_eq!(payload[19], 0xA9);

        let mut buffer = EventBuffer::new();
        assert!(buffer.push(first).is_empty());
        let events = buffer.push(second);
        match &events[..] {
            [SseEvent::Fragment(text)] => assert_eq!(text, "héllo"),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn event_buffer_parses_trailing_event_without_blank_line() {
        let mut buffer = EventBuffer::new();
        assert!(buffer.push(b"data: {\"delta\": \"tail\"}").is_empty());
        match buffer.finish() {
            SseEvent::Fragment(text) => assert_eq!(text, "tail"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn fragment_payloads_accept_bare_strings() {
        assert_eq!(fragment_text("\"chunk\""), "chunk");
        assert_eq!(fragment_text("plain chunk"), "plain chunk");
        assert_eq!(fragment_text("{\"delta\":\" world\"}"), " world");
    }
}
