//! HTTP surface for the document service.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `GET /` – Static upload page.
//! - `POST /upload` – Store a PDF, extract its text, and build a per-document
//!   knowledge index through the agent framework. A new upload replaces the
//!   previous document for all callers.
//! - `POST /summarize` – Run the fixed summarization prompt against the
//!   last-uploaded document and normalize the reply's formatting.
//! - `POST /ask` – Run a user question against the document with per-user
//!   conversational history.
//!
//! Every error is recovered at the handler boundary and reported as
//! `{"error": message}` with a 400 (validation) or 500 (upstream) status.

use crate::assistant::AssistantApi;
use crate::config::get_config;
use crate::extract;
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The most recently uploaded file and its derived index.
///
/// At most one exists per process; `/upload` replaces it atomically behind the
/// state lock, so the text and collection always refer to the same file.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Sanitized filename the PDF was stored under.
    pub filename: String,
    /// Extracted plain text, pages joined with newlines.
    pub text: String,
    /// Knowledge collection indexing this document.
    pub collection: String,
}

struct DocState<S> {
    service: Arc<S>,
    document: RwLock<Option<UploadedDocument>>,
}

/// Build the HTTP router for the document service.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AssistantApi + 'static,
{
    let state = Arc::new(DocState {
        service,
        document: RwLock::new(None),
    });
    Router::new()
        .route("/", get(home))
        .route("/upload", post(upload::<S>))
        .route("/summarize", post(summarize::<S>))
        .route("/ask", post(ask::<S>))
        .with_state(state)
}

async fn home() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    message: String,
}

/// Store the uploaded PDF, extract its text, and rebuild the knowledge index.
async fn upload<S>(
    State(state): State<Arc<DocState<S>>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
    S: AssistantApi,
{
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Validation(err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::Validation("No selected file".into()));
        }
        // Extension check is ASCII-case-insensitive; `.PDF` uploads are real.
        if !filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(ApiError::Validation("Invalid file type".into()));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::Validation(err.to_string()))?;
        upload = Some((filename, bytes));
        break;
    }
    let Some((filename, bytes)) = upload else {
        return Err(ApiError::Validation("No file part".into()));
    };

    let config = get_config();
    let stored_name = sanitize_filename(&filename);
    let dir = PathBuf::from(&config.upload_dir);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|err| processing_error(&err))?;
    let path = dir.join(&stored_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|err| processing_error(&err))?;

    let extract_path = path.clone();
    let text = tokio::task::spawn_blocking(move || extract::extract_text(&extract_path))
        .await
        .map_err(|err| processing_error(&err))?
        .map_err(|err| processing_error(&err))?;

    let collection = state
        .service
        .load_document(&path.to_string_lossy(), &text)
        .await
        .map_err(|err| processing_error(&err))?;

    let document = UploadedDocument {
        filename: stored_name,
        text,
        collection,
    };
    tracing::info!(
        file = %document.filename,
        collection = %document.collection,
        chars = document.text.len(),
        "Document uploaded"
    );
    *state.document.write().await = Some(document);

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".into(),
    }))
}

/// Success response for `POST /summarize`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Summarize the current document with the fixed prompt template.
async fn summarize<S>(State(state): State<Arc<DocState<S>>>) -> Result<Json<SummaryResponse>, ApiError>
where
    S: AssistantApi,
{
    let (prompt, collection) = {
        let guard = state.document.read().await;
        let Some(document) = guard.as_ref() else {
            return Err(ApiError::Validation("Please upload a PDF first".into()));
        };
        (summary_prompt(&document.text), document.collection.clone())
    };

    let reply = state
        .service
        .run(&prompt, &collection)
        .await
        .map_err(|err| ApiError::Upstream(format!("Error generating summary: {err}")))?;
    let summary = normalize_summary(reply.trim());
    tracing::info!(collection = %collection, chars = summary.len(), "Summary generated");
    Ok(Json(SummaryResponse { summary }))
}

/// Request body for `POST /ask`.
#[derive(Default, Deserialize)]
struct AskRequest {
    /// Question to answer against the current document.
    #[serde(default)]
    question: Option<String>,
    /// Identifier keying the externally persisted conversation history.
    #[serde(default)]
    user_id: Option<String>,
}

/// Success response for `POST /ask`.
#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

/// Answer a question against the current document with conversational history.
async fn ask<S>(
    State(state): State<Arc<DocState<S>>>,
    body: Option<Json<AskRequest>>,
) -> Result<Json<AnswerResponse>, ApiError>
where
    S: AssistantApi,
{
    let (text, collection) = {
        let guard = state.document.read().await;
        let Some(document) = guard.as_ref() else {
            return Err(ApiError::Validation("Please upload a PDF first".into()));
        };
        (document.text.clone(), document.collection.clone())
    };

    let request = body.map(|Json(inner)| inner).unwrap_or_default();
    let question = request
        .question
        .filter(|question| !question.is_empty())
        .ok_or_else(|| ApiError::Validation("No question provided".into()))?;
    let user_id = request.user_id.unwrap_or_else(|| "default_user".into());

    let prompt =
        format!("Using the following PDF content as context:\n\n{text}\n\nQuestion: {question}");
    let answer = state
        .service
        .converse(&prompt, &user_id, &collection)
        .await
        .map_err(|err| ApiError::Upstream(format!("Error processing question: {err}")))?;
    tracing::info!(user_id = %user_id, chars = answer.len(), "Question answered");
    Ok(Json(AnswerResponse { answer }))
}

/// Fixed summarization template embedding the full extracted text.
fn summary_prompt(content: &str) -> String {
    format!(
        "Please provide a concise, well-formatted summary of this document with clear line spacing and bullet points:

OVERVIEW:
- Brief 2-3 line description of what this document is about.

KEY TOPICS:
- Topic 1: Main point
- Topic 2: Main point
- Topic 3: Main point

MAIN FINDINGS/CONCLUSIONS:
- Key conclusion 1
- Key conclusion 2
- Key conclusion 3

Ensure clear separation between sections, and keep bullet points succinct (1-2 lines each). Avoid extra metadata in the output.

Here is the content to summarize:

{content}"
    )
}

/// Normalize agent output: the mis-encoded bullet glyph becomes a plain
/// hyphen, and newlines are doubled for paragraph spacing.
fn normalize_summary(text: &str) -> String {
    text.replace("â€¢", "-").replace('\n', "\n\n")
}

/// Reduce a filename to its final component and a conservative character set.
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|part| part.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

fn processing_error(err: &dyn std::fmt::Display) -> ApiError {
    ApiError::Upstream(format!("Error processing PDF: {err}"))
}

/// Error reported to document-service clients as `{"error": message}`.
enum ApiError {
    /// Malformed or missing request fields.
    Validation(String),
    /// Extraction, indexing, or agent-call failure.
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Self::Upstream(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
