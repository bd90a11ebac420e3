//! Document loading.
//!
//! A document is a unit of source text plus the metadata needed to cite it.

mod csv;

pub use self::csv::load_csv;

use serde::{Deserialize, Serialize};

/// Metadata attached to a document and inherited by its chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source column value, or the file name when no source column is used.
    pub source: String,
    /// Zero-based record index in the source file.
    pub row: usize,
}

/// A loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: String, source: String, row: usize) -> Self {
        Self {
            content,
            metadata: DocumentMetadata { source, row },
        }
    }
}
