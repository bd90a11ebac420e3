//! Pipeline orchestrator for voxsql.
//!
//! Coordinates CSV loading, splitting, embedding and indexing, and builds the
//! retriever and SQL agent on top of the resulting index.

use crate::agent::{ChatBackend, ProviderChat, SqlAgent, ToolContext};
use crate::chunking::{create_splitter, TextSplitter};
use crate::config::{Prompts, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{Result, VoxsqlError};
use crate::loader::load_csv;
use crate::rag::{RetrievedContext, Retriever};
use crate::vector_store::{MemoryVectorStore, StoredChunk, VectorStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the voxsql pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    splitter: Box<dyn TextSplitter>,
    vector_store: Arc<dyn VectorStore>,
}

impl Orchestrator {
    /// Create a new orchestrator with the configured embedder and an empty index.
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = create_embedder(&settings)?;
        Self::with_components(settings, embedder, Arc::new(MemoryVectorStore::new()))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let splitter = create_splitter(&settings.chunking);

        Ok(Self {
            settings,
            prompts,
            embedder,
            splitter,
            vector_store,
        })
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Retriever over the current index using the configured k.
    pub fn retriever(&self) -> Retriever {
        Retriever::new(
            self.vector_store.clone(),
            self.embedder.clone(),
            self.settings.retrieval.k,
        )
    }

    /// Load a CSV file, replacing the current index with its chunks.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn load_csv(&self, path: &Path, source_column: Option<&str>) -> Result<LoadResult> {
        let csv_path = path.to_path_buf();
        let column = source_column.map(str::to_string);
        let documents =
            tokio::task::spawn_blocking(move || load_csv(&csv_path, column.as_deref()))
                .await
                .map_err(|e| VoxsqlError::DocumentLoad(format!("CSV loading task failed: {}", e)))??;
        let chunks = self.splitter.split_documents(&documents);

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(VoxsqlError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let stored: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredChunk::new(chunk, embedding))
            .collect();

        let ids = self.vector_store.replace_all(stored).await?;

        info!(
            "Indexed {} documents as {} chunks",
            documents.len(),
            ids.len()
        );

        Ok(LoadResult {
            documents_loaded: documents.len(),
            document_chunks: ids.len(),
        })
    }

    /// Retrieve context for a query from the current index.
    pub async fn retrieve_context(&self, query: &str) -> Result<RetrievedContext> {
        self.retriever().retrieve(query).await
    }

    /// Build a SQL agent that talks to the provider with `api_key`.
    pub fn build_agent(&self, api_key: &str) -> Result<SqlAgent> {
        let chat = ProviderChat::new(&self.settings.provider, &self.settings.llm, api_key)?;
        Ok(self.build_agent_with(Arc::new(chat)))
    }

    /// Build a SQL agent on top of an arbitrary chat backend.
    pub fn build_agent_with(&self, chat: Arc<dyn ChatBackend>) -> SqlAgent {
        SqlAgent::with_prompts(chat, ToolContext::new(self.retriever()), &self.prompts)
            .with_max_iterations(self.settings.llm.max_iterations)
    }
}

/// Result of loading a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadResult {
    /// Rows read from the file.
    pub documents_loaded: usize,
    /// Chunks indexed from those rows.
    pub document_chunks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::KeywordEmbedder;
    use std::io::Write;

    fn orchestrator() -> Orchestrator {
        Orchestrator::with_components(
            Settings::default(),
            Arc::new(KeywordEmbedder),
            Arc::new(MemoryVectorStore::new()),
        )
        .unwrap()
    }

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_and_retrieve() {
        let orchestrator = orchestrator();
        let file = csv_file(
            "table,column,description\n\
             orders,total,Order total in cents\n\
             customers,email,Customer email address\n\
             products,name,Product display name\n",
        );

        let result = orchestrator.load_csv(file.path(), Some("description")).await.unwrap();
        assert_eq!(result.documents_loaded, 3);
        assert_eq!(result.document_chunks, 3);

        let context = orchestrator.retrieve_context("customer email").await.unwrap();
        assert_eq!(context.len(), 2);
        assert!(context.serialized.starts_with("Source: {\"source\":\"Customer email address\""));
    }

    #[tokio::test]
    async fn test_reload_replaces_index() {
        let orchestrator = orchestrator();
        let first = csv_file("table,description\norders,Orders\ncustomers,Customers\n");
        let second = csv_file("table,description\nproducts,Products\n");

        orchestrator.load_csv(first.path(), Some("description")).await.unwrap();
        orchestrator.load_csv(second.path(), Some("description")).await.unwrap();

        assert_eq!(orchestrator.vector_store().chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_long_rows_split_into_several_chunks() {
        let mut settings = Settings::default();
        settings.chunking.chunk_size = 40;
        settings.chunking.chunk_overlap = 10;
        let orchestrator = Orchestrator::with_components(
            settings,
            Arc::new(KeywordEmbedder),
            Arc::new(MemoryVectorStore::new()),
        )
        .unwrap();

        let file = csv_file(
            "table,description\n\
             orders,One row per order with the order date and the customer who placed it\n",
        );

        let result = orchestrator.load_csv(file.path(), None).await.unwrap();
        assert_eq!(result.documents_loaded, 1);
        assert!(result.document_chunks > 1);
        assert_eq!(orchestrator.vector_store().document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_column_keeps_previous_index() {
        let orchestrator = orchestrator();
        let good = csv_file("table,description\norders,Orders\n");
        let bad = csv_file("table,notes\norders,Orders\n");

        orchestrator.load_csv(good.path(), Some("description")).await.unwrap();
        assert!(orchestrator.load_csv(bad.path(), Some("description")).await.is_err());
        assert_eq!(orchestrator.vector_store().chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_csv_leaves_index_empty() {
        let orchestrator = orchestrator();
        let dir = tempfile::tempdir().unwrap();

        let err = orchestrator
            .load_csv(&dir.path().join("absent.csv"), Some("description"))
            .await
            .unwrap_err();
        assert!(matches!(err, VoxsqlError::Csv(_)));
        assert_eq!(orchestrator.vector_store().chunk_count().await.unwrap(), 0);
    }

    #[test]
    fn test_build_agent_without_network() {
        let orchestrator = orchestrator();
        assert!(orchestrator.build_agent("gsk-test").is_ok());
    }
}
