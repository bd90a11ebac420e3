//! Prompt templates for voxsql.
//!
//! Prompts can be customized by placing a `sql.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub sql: SqlPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the SQL generation agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlPrompts {
    pub system: String,
    /// Description advertised for the `retrieve_context` tool.
    pub tool_description: String,
}

impl Default for SqlPrompts {
    fn default() -> Self {
        Self {
            system: "Use the retrieve_context tool to get info from CSV (table, column names, descriptions). \
                     Write SQL to answer the user's query. Return only the SQL."
                .to_string(),
            tool_description: "Look up tables, columns and their descriptions from the loaded CSV. \
                               Pass a short natural-language description of the data you need."
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, applying overrides from `custom_dir` and config variables.
    pub fn load(
        custom_dir: Option<&str>,
        variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let sql_path = custom_path.join("sql.toml");
            if sql_path.exists() {
                let content = std::fs::read_to_string(&sql_path)?;
                prompts.sql = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// The SQL system prompt with config variables substituted.
    pub fn sql_system(&self) -> String {
        Self::render(&self.sql.system, &self.variables)
    }
}
