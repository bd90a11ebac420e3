//! In-memory vector store implementation.

use super::{cosine_similarity, SearchResult, StoredChunk, VectorStore};
use crate::error::{Result, VoxsqlError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// In-memory vector store.
pub struct MemoryVectorStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<StoredChunk>>> {
        self.chunks
            .read()
            .map_err(|_| VoxsqlError::VectorStore("index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<StoredChunk>>> {
        self.chunks
            .write()
            .map_err(|_| VoxsqlError::VectorStore("index lock poisoned".to_string()))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_chunks(&self, chunks: Vec<StoredChunk>) -> Result<Vec<Uuid>> {
        let ids = chunks.iter().map(|c| c.id).collect();
        self.write()?.extend(chunks);
        Ok(ids)
    }

    async fn replace_all(&self, chunks: Vec<StoredChunk>) -> Result<Vec<Uuid>> {
        let ids = chunks.iter().map(|c| c.id).collect();
        *self.write()? = chunks;
        Ok(ids)
    }

    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let chunks = self.read()?;

        let mut results: Vec<SearchResult> = chunks
            .iter()
            .map(|chunk| SearchResult {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        Ok(results)
    }

    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn document_count(&self) -> Result<usize> {
        let chunks = self.read()?;
        let rows: HashSet<usize> = chunks.iter().map(|c| c.metadata.row).collect();
        Ok(rows.len())
    }
}
