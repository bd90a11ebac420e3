//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, VoxsqlError};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Transcription requires an API key and a supported audio file.
    Transcribe,
    /// SQL generation requires an API key and a CSV file.
    GenerateSql,
    /// The server starts without a key; requests needing one fail later.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Transcribe | Operation::GenerateSql => {
            require_api_key(settings)?;
        }
        Operation::Serve => {
            check_temp_dir(&settings.temp_dir())?;
        }
    }
    Ok(())
}

/// Check that a file exists and carries an accepted extension.
pub fn check_input_file(path: &Path, accept: impl Fn(&str) -> bool, kind: &str) -> Result<()> {
    if !path.is_file() {
        return Err(VoxsqlError::InvalidInput(format!(
            "{} not found: {}",
            kind,
            path.display()
        )));
    }
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if !accept(name) {
        return Err(VoxsqlError::InvalidInput(format!(
            "Unsupported {} file: {}",
            kind,
            path.display()
        )));
    }
    Ok(())
}

/// Resolve the provider API key or explain how to set it.
pub fn require_api_key(settings: &Settings) -> Result<String> {
    let var = &settings.provider.api_key_env;
    settings.resolve_api_key(None).ok_or_else(|| {
        VoxsqlError::Config(format!(
            "{} not set. Set it with: export {}='gsk_...' or provider.api_key in the config file",
            var, var
        ))
    })
}

/// Check that the upload directory can be created.
fn check_temp_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        VoxsqlError::Config(format!("Cannot create temp dir {}: {}", dir.display(), e))
    })
}
