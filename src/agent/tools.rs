//! Tool definitions and implementations for the SQL agent.

use crate::error::{Result, VoxsqlError};
use crate::rag::Retriever;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde::{Deserialize, Serialize};

/// Name the model uses to call the retrieval tool.
pub const RETRIEVE_CONTEXT: &str = "retrieve_context";

/// Available tools for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Look up schema rows similar to a query.
    RetrieveContext { query: String },
}

/// Tool execution context.
#[derive(Clone)]
pub struct ToolContext {
    pub retriever: Retriever,
}

impl ToolContext {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::RetrieveContext { query } => {
                let context = self.retriever.retrieve(query).await?;
                if context.is_empty() {
                    Ok("No matching tables or columns found.".to_string())
                } else {
                    Ok(context.serialized)
                }
            }
        }
    }
}

/// Get OpenAI function/tool definitions for the agent.
pub fn tool_definitions(retrieve_description: &str) -> Vec<ChatCompletionTool> {
    vec![ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: RETRIEVE_CONTEXT.to_string(),
            description: Some(retrieve_description.to_string()),
            parameters: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look up, e.g. \"customer email addresses\""
                    }
                },
                "required": ["query"]
            })),
            strict: None,
        },
    }]
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| VoxsqlError::Agent(format!("Invalid tool arguments: {}", e)))?;

    match name {
        RETRIEVE_CONTEXT => {
            let query = args["query"]
                .as_str()
                .ok_or_else(|| VoxsqlError::Agent("Missing 'query' argument".to_string()))?
                .to_string();
            Ok(ToolCall::RetrieveContext { query })
        }
        _ => Err(VoxsqlError::Agent(format!("Unknown tool: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retrieve_context() {
        let tool = parse_tool_call("retrieve_context", r#"{"query": "orders by customer"}"#).unwrap();
        assert_eq!(
            tool,
            ToolCall::RetrieveContext {
                query: "orders by customer".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_tool() {
        let err = parse_tool_call("drop_table", r#"{"query": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("Unknown tool: drop_table"));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(parse_tool_call("retrieve_context", "not json").is_err());
        assert!(parse_tool_call("retrieve_context", r#"{"q": "x"}"#).is_err());
    }

    #[test]
    fn test_tool_definitions() {
        let tools = tool_definitions("Look up columns");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "retrieve_context");
        assert_eq!(tools[0].function.description.as_deref(), Some("Look up columns"));
    }
}
