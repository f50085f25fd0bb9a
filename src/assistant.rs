//! Assistant service coordinating agent runs and knowledge loading.

use crate::{
    agent::{AgentClient, AgentError, KnowledgeBinding, RunRequest, StorageBinding},
    config::get_config,
    knowledge::{KnowledgeClient, KnowledgeError},
};
use async_trait::async_trait;

/// Table the framework uses to persist per-user conversations.
const STORAGE_TABLE: &str = "pdf_assistant";

/// Errors surfaced by the assistant service.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Agent run failed.
    #[error("{0}")]
    Agent(#[from] AgentError),
    /// Knowledge-base load failed.
    #[error("{0}")]
    Knowledge(#[from] KnowledgeError),
}

/// Abstraction over the upstream calls made by the document handlers.
///
/// The HTTP surface depends on this trait so tests can substitute a stub for
/// the hosted framework.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Load extracted text into a fresh document-scoped collection.
    ///
    /// Returns the name of the collection that now indexes the document.
    async fn load_document(
        &self,
        source_uri: &str,
        content: &str,
    ) -> Result<String, AssistantError>;

    /// Run the agent once against a document collection and return its text.
    async fn run(&self, prompt: &str, collection: &str) -> Result<String, AssistantError>;

    /// Run the conversational agent with per-user history, concatenating the
    /// streamed fragments in arrival order.
    async fn converse(
        &self,
        prompt: &str,
        user_id: &str,
        collection: &str,
    ) -> Result<String, AssistantError>;
}

/// Production implementation composing the agent and knowledge clients.
///
/// Construct the service once near process start and share it through an
/// `Arc`; both clients hold long-lived reqwest handles.
pub struct AssistantService {
    agent: AgentClient,
    knowledge: KnowledgeClient,
}

impl AssistantService {
    /// Build a new assistant service from the loaded configuration.
    pub fn new() -> Result<Self, AssistantError> {
        tracing::info!("Initializing agent framework clients");
        Ok(Self {
            agent: AgentClient::new()?,
            knowledge: KnowledgeClient::new()?,
        })
    }

    fn knowledge_binding(&self, collection: &str) -> KnowledgeBinding {
        KnowledgeBinding {
            collection: collection.to_string(),
            db_url: self.knowledge.db_url().to_string(),
        }
    }
}

#[async_trait]
impl AssistantApi for AssistantService {
    async fn load_document(
        &self,
        source_uri: &str,
        content: &str,
    ) -> Result<String, AssistantError> {
        let collection = self.knowledge.document_collection();
        self.knowledge
            .load_document(&collection, source_uri, content)
            .await?;
        Ok(collection)
    }

    async fn run(&self, prompt: &str, collection: &str) -> Result<String, AssistantError> {
        let config = get_config();
        let mut request = RunRequest::new(config.agent_model.clone(), prompt);
        request.knowledge = Some(self.knowledge_binding(collection));
        request.search_knowledge = true;
        let reply = self.agent.run(&request).await?;
        Ok(reply.text)
    }

    async fn converse(
        &self,
        prompt: &str,
        user_id: &str,
        collection: &str,
    ) -> Result<String, AssistantError> {
        let config = get_config();
        let mut request = RunRequest::new(config.agent_model.clone(), prompt);
        request.user_id = Some(user_id.to_string());
        request.storage = Some(StorageBinding {
            table: STORAGE_TABLE.to_string(),
            db_url: self.knowledge.db_url().to_string(),
        });
        request.knowledge = Some(self.knowledge_binding(collection));
        request.search_knowledge = true;
        request.read_chat_history = true;
        self.agent.run_streamed(&request).await.map_err(Into::into)
    }
}
