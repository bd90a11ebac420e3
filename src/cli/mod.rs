//! CLI module for voxsql.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// voxsql - turn spoken questions into SQL
///
/// Transcribes audio, indexes a CSV of table and column descriptions, and asks
/// an LLM to write SQL using that schema as context.
#[derive(Parser, Debug)]
#[command(name = "voxsql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Transcribe an audio file and print the text
    Transcribe {
        /// Audio file (mp3, wav, ogg, m4a, flac)
        file: PathBuf,
    },

    /// Load a schema CSV and generate SQL for a question
    Sql {
        /// CSV file describing tables and columns
        #[arg(long)]
        csv: PathBuf,

        /// Column used as each row's source (file name if empty)
        #[arg(short, long, default_value = "description")]
        source_column: String,

        /// Natural-language question
        query: String,
    },

    /// Check configuration and connectivity prerequisites
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
