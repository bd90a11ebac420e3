//! Retrieval of CSV context for SQL generation.
//!
//! The retriever embeds a query, looks up the nearest chunks and renders them
//! as a plain-text block the LLM can read.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{SearchResult, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Context returned for a query.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Hits rendered as `Source: ...\nContent: ...` blocks.
    pub serialized: String,
    /// The raw hits, best first.
    pub results: Vec<SearchResult>,
}

impl RetrievedContext {
    /// Number of chunks that contributed to the context.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Similarity search over the chunk index.
#[derive(Clone)]
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    k: usize,
}

impl Retriever {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, k: usize) -> Self {
        Self {
            vector_store,
            embedder,
            k,
        }
    }

    /// Override the number of hits per query.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Retrieve the top-k chunks for `query`.
    #[instrument(skip(self), fields(k = self.k))]
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        if self.vector_store.chunk_count().await? == 0 {
            debug!("Index is empty, returning no context");
            return Ok(RetrievedContext {
                serialized: String::new(),
                results: Vec::new(),
            });
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self.vector_store.search(&query_embedding, self.k).await?;
        let serialized = format_context(&results)?;

        debug!("Retrieved {} chunks", results.len());
        Ok(RetrievedContext {
            serialized,
            results,
        })
    }
}

/// Render hits for the LLM, one block per chunk separated by a blank line.
pub fn format_context(results: &[SearchResult]) -> Result<String> {
    let blocks = results
        .iter()
        .map(|r| -> Result<String> {
            Ok(format!(
                "Source: {}\nContent: {}",
                serde_json::to_string(&r.chunk.metadata)?,
                r.chunk.content
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(blocks.join("\n\n"))
}
