//! Doctor command - verify configuration and local prerequisites.

use crate::cli::Output;
use crate::config::{EmbeddingProvider, Settings};
use crate::embedding::supports_local_model;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("voxsql Doctor");
    println!();
    println!("Checking configuration...\n");

    let sections: Vec<(&str, Vec<CheckResult>)> = vec![
        ("API Configuration", vec![check_api_key(settings)]),
        ("Embeddings", check_embedding(settings)),
        ("Directories", vec![check_temp_dir(&settings.temp_dir())]),
        (
            "Configuration",
            vec![check_config_file(), check_settings(settings)],
        ),
    ];

    let mut checks = Vec::new();
    for (title, results) in sections {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    }

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using voxsql.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! voxsql is ready to use.");
    }

    Ok(())
}

/// Check the provider API key used for transcription and SQL generation.
fn check_api_key(settings: &Settings) -> CheckResult {
    let name = settings.provider.api_key_env.as_str();
    match settings.resolve_api_key(None) {
        Some(key) => CheckResult::ok(name, &format!("configured ({})", mask_key(&key))),
        None => CheckResult::warning(
            name,
            "not set",
            &format!(
                "Set with: export {}='gsk_...' (or pass groq_api_key to /load-csv)",
                name
            ),
        ),
    }
}

/// Check the embedding backend can be constructed.
fn check_embedding(settings: &Settings) -> Vec<CheckResult> {
    let embedding = &settings.embedding;
    match embedding.provider {
        EmbeddingProvider::Local => {
            let model = if supports_local_model(&embedding.model) {
                CheckResult::ok("Model", &format!("{} (local)", embedding.model))
            } else {
                CheckResult::error(
                    "Model",
                    &format!("{} is not a supported local model", embedding.model),
                    "Use all-minilm-l6-v2, bge-small-en-v1.5 or bge-base-en-v1.5",
                )
            };

            let cache_dir = settings.model_cache_dir();
            let cache = if cache_dir.exists() {
                CheckResult::ok("Model cache", &cache_dir.display().to_string())
            } else {
                CheckResult::warning(
                    "Model cache",
                    &format!("{} (empty)", cache_dir.display()),
                    "Model files are downloaded on first start",
                )
            };

            vec![model, cache]
        }
        EmbeddingProvider::OpenAI => {
            let key = match std::env::var(&embedding.api_key_env) {
                Ok(k) if !k.is_empty() => CheckResult::ok(
                    &embedding.api_key_env,
                    &format!("configured ({})", mask_key(&k)),
                ),
                _ => CheckResult::error(
                    &embedding.api_key_env,
                    "not set",
                    &format!("Set with: export {}='sk-...'", embedding.api_key_env),
                ),
            };
            vec![
                CheckResult::ok("Model", &format!("{} (remote)", embedding.model)),
                key,
            ]
        }
    }
}

/// Check the upload directory exists or can be created.
fn check_temp_dir(dir: &Path) -> CheckResult {
    if dir.is_dir() {
        CheckResult::ok("Temp directory", &dir.display().to_string())
    } else if dir.exists() {
        CheckResult::error(
            "Temp directory",
            &format!("{} is not a directory", dir.display()),
            "Point general.temp_dir at a directory",
        )
    } else {
        CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", dir.display()),
            "Directory will be created on first upload",
        )
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: voxsql config init",
        )
    }
}

fn check_settings(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::ok(
            "Settings",
            &format!(
                "chunk {} / overlap {}, k = {}, model {}",
                settings.chunking.chunk_size,
                settings.chunking.chunk_overlap,
                settings.retrieval.k,
                settings.llm.model
            ),
        ),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix the config file"),
    }
}

/// Show only the ends of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("gsk_abcdefghijklmnop"), "gsk_...mnop");
    }

    #[test]
    fn test_unknown_local_model_is_error() {
        let mut settings = Settings::default();
        settings.embedding.model = "not-a-model".to_string();
        let checks = check_embedding(&settings);
        assert_eq!(checks[0].status, CheckStatus::Error);
    }

    #[test]
    fn test_temp_dir_that_is_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(check_temp_dir(file.path()).status, CheckStatus::Error);
    }
}
