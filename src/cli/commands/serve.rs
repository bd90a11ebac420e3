//! HTTP API server command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::server::{self, AppState};
use std::sync::Arc;

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    mut settings: Settings,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    preflight::check(Operation::Serve, &settings)?;

    let spinner = Output::spinner("Loading embedding model...");
    let state = AppState::new(settings.clone());
    spinner.finish_and_clear();
    let state = Arc::new(state?);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    Output::header("voxsql API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Docs", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Transcribe", "POST /transcribe");
    Output::kv("Load CSV", "POST /load-csv");
    Output::kv("Retrieve", "POST /retrieve-context");
    Output::kv("Generate SQL", "POST /generate-sql");
    println!();
    if settings.resolve_api_key(None).is_none() {
        Output::warning(&format!(
            "{} is not set. /transcribe is disabled and /load-csv needs groq_api_key.",
            settings.provider.api_key_env
        ));
    }
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(state, &settings.server.host, settings.server.port).await
}
