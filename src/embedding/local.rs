//! In-process sentence-transformer embeddings via fastembed.

use super::Embedder;
use crate::error::{Result, VoxsqlError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Resolve a model name to a fastembed model and its output dimensions.
fn resolve_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            Ok((fastembed::EmbeddingModel::AllMiniLML6V2, 384))
        }
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => {
            Ok((fastembed::EmbeddingModel::BGESmallENV15, 384))
        }
        "bge-base-en-v1.5" | "baai/bge-base-en-v1.5" => {
            Ok((fastembed::EmbeddingModel::BGEBaseENV15, 768))
        }
        other => Err(VoxsqlError::Config(format!(
            "Unsupported local embedding model: {}",
            other
        ))),
    }
}

/// Check whether `name` is a model the local embedder can load.
pub fn supports_local_model(name: &str) -> bool {
    resolve_model(name).is_ok()
}

/// Local embedder.
///
/// Inference is CPU-bound, so calls run on the blocking pool.
pub struct LocalEmbedder {
    model: Arc<fastembed::TextEmbedding>,
    dimensions: usize,
}

impl LocalEmbedder {
    /// Load `model_name`, downloading model files into `cache_dir` on first use.
    pub fn new(model_name: &str, cache_dir: &Path) -> Result<Self> {
        let (model, dimensions) = resolve_model(model_name)?;
        info!("Loading local embedding model {}", model_name);

        let options = fastembed::InitOptions::new(model)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(false);

        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| VoxsqlError::Embedding(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| VoxsqlError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model.clone();
        let texts = texts.to_vec();
        let embeddings = tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| VoxsqlError::Embedding(format!("embedding task failed: {}", e)))?
            .map_err(|e| VoxsqlError::Embedding(e.to_string()))?;

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_models() {
        assert_eq!(resolve_model("all-MiniLM-L6-v2").unwrap().1, 384);
        assert_eq!(resolve_model("BAAI/bge-base-en-v1.5").unwrap().1, 768);
    }

    #[test]
    fn test_resolve_unknown_model() {
        assert!(matches!(
            resolve_model("gpt-embedder-9000"),
            Err(VoxsqlError::Config(_))
        ));
    }
}
