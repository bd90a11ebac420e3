//! Text splitting for embedding.
//!
//! Documents are cut into overlapping windows of bounded length so each
//! embedding covers a focused span of text.

mod recursive;

pub use recursive::RecursiveCharacterSplitter;

use crate::config::ChunkingSettings;
use crate::loader::Document;
use serde::{Deserialize, Serialize};

/// Metadata carried by a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Inherited from the source document.
    pub source: String,
    /// Inherited from the source document.
    pub row: usize,
    /// Character offset of the chunk inside the document content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
}

/// A piece of a document ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Trait for text splitters.
pub trait TextSplitter: Send + Sync {
    /// Split raw text into chunks.
    fn split_text(&self, text: &str) -> Vec<String>;

    /// Number of characters consecutive chunks may share.
    fn chunk_overlap(&self) -> usize;

    /// Split documents, attaching each chunk's start offset.
    fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            let mut index = 0usize;
            let mut previous_len = 0usize;

            for content in self.split_text(&doc.content) {
                let offset = (index + previous_len).saturating_sub(self.chunk_overlap());
                let start_index = find_from_char(&doc.content, &content, offset);
                index = start_index.unwrap_or(offset);
                previous_len = content.chars().count();

                chunks.push(Chunk {
                    content,
                    metadata: ChunkMetadata {
                        source: doc.metadata.source.clone(),
                        row: doc.metadata.row,
                        start_index,
                    },
                });
            }
        }

        chunks
    }
}

/// Create the splitter described by the settings.
pub fn create_splitter(settings: &ChunkingSettings) -> Box<dyn TextSplitter> {
    Box::new(RecursiveCharacterSplitter::new(
        settings.chunk_size,
        settings.chunk_overlap,
    ))
}

/// Find `needle` in `haystack` at or after the char offset `from`, returning a char offset.
fn find_from_char(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_start = haystack
        .char_indices()
        .nth(from)
        .map(|(b, _)| b)
        .unwrap_or(haystack.len());

    haystack[byte_start..]
        .find(needle)
        .map(|pos| haystack[..byte_start + pos].chars().count())
}
