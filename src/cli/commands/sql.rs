//! SQL command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::server::is_csv;
use anyhow::Result;
use std::path::Path;

/// Index a schema CSV and generate SQL for one question.
pub async fn run_sql(
    csv: &Path,
    source_column: &str,
    query: &str,
    settings: Settings,
) -> Result<()> {
    let checked = preflight::check(Operation::GenerateSql, &settings)
        .and_then(|_| preflight::check_input_file(csv, is_csv, "CSV"))
        .and_then(|_| preflight::require_api_key(&settings));

    let api_key = match checked {
        Ok(key) => key,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'voxsql doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let spinner = Output::spinner("Loading embedding model...");
    let orchestrator = Orchestrator::new(settings);
    spinner.finish_and_clear();
    let orchestrator = orchestrator?;

    let source_column = Some(source_column.trim()).filter(|c| !c.is_empty());

    let spinner = Output::spinner("Indexing CSV...");
    let loaded = orchestrator.load_csv(csv, source_column).await;
    spinner.finish_and_clear();
    let loaded = loaded?;

    Output::success(&format!(
        "Indexed {} rows as {} chunks",
        loaded.documents_loaded, loaded.document_chunks
    ));

    let context = orchestrator.retrieve_context(query).await?;
    if !context.is_empty() {
        Output::header("Closest schema entries");
        for hit in &context.results {
            Output::context_hit(&hit.chunk.metadata.source, hit.score, &hit.chunk.content);
        }
    }

    let agent = orchestrator.build_agent(&api_key)?;

    let spinner = Output::spinner("Generating SQL...");
    let generated = agent.generate_sql(query).await;
    spinner.finish_and_clear();

    match generated {
        Ok(generated) => {
            for call in &generated.tool_calls {
                Output::kv("Tool", &call.to_string());
            }
            Output::sql(&generated.sql);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to generate SQL: {}", e));
            Err(e.into())
        }
    }
}
