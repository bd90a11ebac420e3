//! voxsql - Voice to SQL
//!
//! Turns spoken or typed questions into SQL, grounded in a CSV that describes
//! the target database's tables and columns.
//!
//! # Overview
//!
//! voxsql lets you:
//! - Transcribe a recorded question with a Whisper model
//! - Index a schema description CSV for similarity search
//! - Retrieve the table and column descriptions closest to a question
//! - Have an LLM agent write SQL, looking up schema context as it goes
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `transcription` - Speech-to-text transcription
//! - `loader` - CSV rows to documents
//! - `chunking` - Recursive character text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - In-memory vector index
//! - `rag` - Context retrieval and formatting
//! - `agent` - Tool-calling SQL agent
//! - `orchestrator` - Pipeline coordination
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use voxsql::config::Settings;
//! use voxsql::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let api_key = settings.resolve_api_key(None).unwrap_or_default();
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let loaded = orchestrator
//!         .load_csv("schema.csv".as_ref(), Some("description"))
//!         .await?;
//!     println!("Indexed {} chunks", loaded.document_chunks);
//!
//!     let agent = orchestrator.build_agent(&api_key)?;
//!     let generated = agent.generate_sql("Total revenue per customer").await?;
//!     println!("{}", generated.sql);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod loader;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod server;
pub mod transcription;
pub mod vector_store;

pub use error::{Result, VoxsqlError};
