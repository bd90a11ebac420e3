//! Embedding generation for similarity search.

mod local;
mod openai;

pub use local::{supports_local_model, LocalEmbedder};
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, Settings};
use crate::error::{Result, VoxsqlError};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the embedder selected in the settings.
pub fn create_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    match settings.embedding.provider {
        EmbeddingProvider::Local => Ok(Arc::new(LocalEmbedder::new(
            &settings.embedding.model,
            &settings.model_cache_dir(),
        )?)),
        EmbeddingProvider::OpenAI => {
            let api_key = std::env::var(&settings.embedding.api_key_env).map_err(|_| {
                VoxsqlError::Config(format!(
                    "{} not set (required by the openai embedding provider)",
                    settings.embedding.api_key_env
                ))
            })?;
            Ok(Arc::new(OpenAIEmbedder::with_config(
                &settings.embedding.api_base,
                &api_key,
                &settings.embedding.model,
                settings.embedding.dimensions as usize,
            )?))
        }
    }
}
