//! LLM agent that writes SQL.
//!
//! The agent may call a retrieval tool to look up table and column
//! descriptions from the loaded CSV before producing its final answer.

mod chat;
mod runner;
mod tools;

pub use chat::{ChatBackend, ChatReply, ProviderChat};
pub use runner::{GeneratedSql, SqlAgent, ToolCallRecord};
pub use tools::{parse_tool_call, tool_definitions, ToolCall, ToolContext, RETRIEVE_CONTEXT};
