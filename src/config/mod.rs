//! Configuration module for voxsql.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SqlPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingProvider, EmbeddingSettings, GeneralSettings, LlmSettings,
    PromptSettings, ProviderSettings, RetrievalSettings, ServerSettings, Settings,
    TranscriptionSettings,
};
