//! Transcribe command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::transcription::{is_supported_audio, Transcriber, WhisperTranscriber};
use anyhow::Result;
use std::path::Path;

/// Transcribe a local audio file and print the text.
pub async fn run_transcribe(file: &Path, settings: Settings) -> Result<()> {
    let checked = preflight::check(Operation::Transcribe, &settings)
        .and_then(|_| preflight::check_input_file(file, is_supported_audio, "audio"))
        .and_then(|_| preflight::require_api_key(&settings));

    let api_key = match checked {
        Ok(key) => key,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'voxsql doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    };

    let transcriber =
        WhisperTranscriber::new(&settings.provider, &settings.transcription, &api_key)?;

    let spinner = Output::spinner(&format!("Transcribing with {}...", transcriber.model()));
    let result = transcriber.transcribe(file).await;
    spinner.finish_and_clear();

    match result {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Transcription failed: {}", e));
            Err(e.into())
        }
    }
}
