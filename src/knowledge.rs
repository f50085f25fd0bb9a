//! Knowledge-base loading through the agent framework.
//!
//! Chunking, embedding, and vector storage all happen upstream: the service
//! posts a document's extracted text together with the target collection and
//! the database DSN, and the framework rebuilds the collection from scratch.
//! Each upload targets a fresh, uuid-suffixed collection so that the index and
//! the stored text always refer to the same file.

use crate::agent::{ensure_success, format_endpoint, normalize_base_url};
use crate::config::get_config;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while loading a document into the knowledge base.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Transport-level failure reported by reqwest.
    #[error("Knowledge request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The framework answered with a non-success status code.
    #[error("Knowledge API returned {status}: {body}")]
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

#[derive(Serialize)]
struct LoadRequest<'a> {
    collection: &'a str,
    db_url: &'a str,
    source_uri: &'a str,
    content: &'a str,
    recreate: bool,
}

/// Counters reported by the framework after a load completes.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LoadOutcome {
    /// Number of documents ingested (always 1 for a single PDF).
    #[serde(default)]
    pub documents: usize,
    /// Number of chunks written to the vector collection.
    #[serde(default)]
    pub chunks: usize,
}

/// HTTP client for the framework's knowledge API.
pub struct KnowledgeClient {
    client: Client,
    base_url: String,
    api_key: String,
    db_url: String,
}

impl KnowledgeClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, KnowledgeError> {
        let config = get_config();
        let client = Client::builder().user_agent("docagent/0.2").build()?;
        let base_url =
            normalize_base_url(&config.agent_api_url).map_err(KnowledgeError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized knowledge client");

        Ok(Self {
            client,
            base_url,
            api_key: config.groq_api_key.clone(),
            db_url: config.database_url.clone(),
        })
    }

    /// Derive a collection name scoped to a single uploaded document.
    pub fn document_collection(&self) -> String {
        let config = get_config();
        format!(
            "{}_{}",
            config.knowledge_collection,
            Uuid::new_v4().simple()
        )
    }

    /// Load extracted text into the given collection, replacing prior contents.
    pub async fn load_document(
        &self,
        collection: &str,
        source_uri: &str,
        content: &str,
    ) -> Result<LoadOutcome, KnowledgeError> {
        let body = LoadRequest {
            collection,
            db_url: &self.db_url,
            source_uri,
            content,
            recreate: true,
        };
        let url = format_endpoint(&self.base_url, "v1/knowledge/pdf/load");
        let response = self
            .client
            .request(Method::POST, url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response =
            ensure_success(response, |status, body| KnowledgeError::UnexpectedStatus {
                status,
                body,
            })
            .await?;

        let outcome: LoadOutcome = response.json().await.unwrap_or_default();
        tracing::info!(
            collection,
            source_uri,
            chunks = outcome.chunks,
            "Knowledge base loaded"
        );
        Ok(outcome)
    }

    /// Database connection string forwarded alongside knowledge references.
    pub fn db_url(&self) -> &str {
        &self.db_url
    }
}
