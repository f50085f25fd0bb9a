//! The legal chat service: a preconfigured agent behind a single endpoint.
//!
//! The agent is constructed once at startup. If construction fails, the
//! router is built around that absence as one well-defined state and every
//! `/chat` request answers 500 until the process restarts. Errors on this
//! surface use the `{"response": message}` shape the original frontend
//! expects, for both successes and failures.

use crate::agent::{AgentClient, AgentError, RunRequest};
use crate::config::get_config;
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Instruction list the legal agent is constructed with.
pub const LEGAL_INSTRUCTIONS: &[&str] = &[
    "You are a professional legal assistant specializing in Indian law and the Indian Constitution.",
    "All responses must strictly adhere to the Indian Constitution, IPC, CrPC, Evidence Act, and other relevant Indian legal statutes.",
    "Provide well-structured and professional answers as if given by a legal authority or a constitutional body.",
    "Ensure fairness, neutrality, and constitutional integrity in responses.",
    "Use structured formatting such as tables, bullet points, and numbered sections where applicable.",
    "When answering legal queries, provide relevant sections and articles from the Indian Constitution or statutes.",
    "Do not provide legal opinions or interpretations beyond established legal principles and precedents.",
    "If the question is beyond Indian law, politely decline and refer the user to a qualified legal professional.",
    "Cite appropriate legal sources (Indian laws, case laws, legal doctrines) to support responses.",
    "Maintain a formal and professional tone in all communications.",
    "When summarizing legal documents, extract key points and provide clear interpretations.",
    "If necessary, suggest legal remedies, precedents, or procedural steps as per Indian law.",
    "ALWAYS respond using proper markdown formatting for all structured content.",
    "Use bullet points for lists and steps.",
    "Format headings using ## symbols.",
    "Use **bold** for important terms and metrics.",
    "Separate sections with horizontal rules (---)",
];

/// Search tools the legal agent may call while answering.
pub const LEGAL_TOOLS: &[&str] = &["wikipedia", "duckduckgo"];

/// Abstraction over the chat agent so the router is testable with stubs.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    /// Forward one message to the agent and return its reply text.
    async fn reply(&self, message: &str) -> Result<String, AgentError>;
}

/// The preconfigured legal assistant agent.
pub struct LegalAgent {
    client: AgentClient,
    model: String,
}

impl LegalAgent {
    /// Construct the agent from the loaded configuration.
    pub fn new() -> Result<Self, AgentError> {
        let config = get_config();
        Ok(Self {
            client: AgentClient::new()?,
            model: config.legal_model.clone(),
        })
    }
}

#[async_trait]
impl ChatAgent for LegalAgent {
    async fn reply(&self, message: &str) -> Result<String, AgentError> {
        let mut request = RunRequest::new(self.model.clone(), message);
        request.instructions = LEGAL_INSTRUCTIONS.iter().map(|s| s.to_string()).collect();
        request.tools = LEGAL_TOOLS.iter().map(|s| s.to_string()).collect();
        let reply = self.client.run(&request).await?;
        Ok(reply.text)
    }
}

struct ChatState<A> {
    agent: Option<Arc<A>>,
}

/// Build the HTTP router for the legal chat service.
///
/// `agent` is `None` when startup construction failed; the router still
/// serves, answering every `/chat` with the initialization error.
pub fn create_chat_router<A>(agent: Option<Arc<A>>) -> Router
where
    A: ChatAgent + 'static,
{
    let state = Arc::new(ChatState { agent });
    Router::new()
        .route("/", get(chat_home))
        .route("/chat", post(chat::<A>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn chat_home() -> Html<&'static str> {
    Html(include_str!("../static/chat.html"))
}

/// Request body for `POST /chat`.
#[derive(Default, Deserialize)]
struct MessageRequest {
    #[serde(default)]
    message: Option<String>,
}

/// Success response for `POST /chat`.
#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

/// Forward a message to the legal agent and return its reply.
async fn chat<A>(
    State(state): State<Arc<ChatState<A>>>,
    body: Option<Json<MessageRequest>>,
) -> Result<Json<ChatResponse>, ChatError>
where
    A: ChatAgent,
{
    let Some(agent) = state.agent.as_ref() else {
        return Err(ChatError::Uninitialized);
    };
    let Some(Json(request)) = body else {
        return Err(ChatError::Validation("No data received".into()));
    };
    let message = request
        .message
        .filter(|message| !message.is_empty())
        .ok_or_else(|| ChatError::Validation("Please provide a message".into()))?;

    tracing::info!(chars = message.len(), "Processing chat message");
    let response = agent
        .reply(&message)
        .await
        .map_err(|err| ChatError::Upstream(err.to_string()))?;
    Ok(Json(ChatResponse { response }))
}

/// Error reported to chat clients as `{"response": message}`.
enum ChatError {
    /// The agent never constructed at startup.
    Uninitialized,
    /// Malformed or missing request fields.
    Validation(String),
    /// Agent invocation failure.
    Upstream(String),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Uninitialized => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The legal agent failed to initialize. Check server logs.".to_string(),
            ),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Self::Upstream(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server error: {message}. Please check server logs for details."),
            ),
        };
        (status, Json(json!({ "response": message }))).into_response()
    }
}
