//! SQL agent with a tool-calling loop.

use super::chat::{ChatBackend, ChatReply};
use super::tools::{parse_tool_call, tool_definitions, ToolContext};
use crate::config::Prompts;
use crate::error::{Result, VoxsqlError};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Matches a fenced code block, with or without a language tag.
const SQL_FENCE_PATTERN: &str = r"(?s)```(?:[A-Za-z]+[ \t]*\n|[ \t]*\n)?(.*?)```";

/// Agent that looks up schema context and writes SQL.
pub struct SqlAgent {
    chat: Arc<dyn ChatBackend>,
    tools: ToolContext,
    tool_definitions: Vec<ChatCompletionTool>,
    system_prompt: String,
    max_iterations: usize,
    sql_fence: Regex,
}

impl SqlAgent {
    /// Create an agent using the default prompts.
    pub fn new(chat: Arc<dyn ChatBackend>, tools: ToolContext) -> Self {
        Self::with_prompts(chat, tools, &Prompts::default())
    }

    /// Create an agent with custom prompts.
    pub fn with_prompts(chat: Arc<dyn ChatBackend>, tools: ToolContext, prompts: &Prompts) -> Self {
        let sql_fence = Regex::new(SQL_FENCE_PATTERN).expect("Invalid regex");

        Self {
            chat,
            tools,
            tool_definitions: tool_definitions(&prompts.sql.tool_description),
            system_prompt: prompts.sql_system(),
            max_iterations: 8,
            sql_fence,
        }
    }

    /// Set maximum model calls for one run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Turn a natural-language question into SQL.
    #[instrument(skip(self))]
    pub async fn generate_sql(&self, query: &str) -> Result<GeneratedSql> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt.clone())
                .build()
                .map_err(|e| VoxsqlError::Agent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(query.to_string())
                .build()
                .map_err(|e| VoxsqlError::Agent(e.to_string()))?
                .into(),
        ];

        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(VoxsqlError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            match self.chat.complete(&messages, &self.tool_definitions).await? {
                ChatReply::ToolCalls(tool_calls) => {
                    let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                        .tool_calls(tool_calls.clone())
                        .build()
                        .map_err(|e| VoxsqlError::Agent(e.to_string()))?;
                    messages.push(assistant_msg.into());

                    for tool_call in &tool_calls {
                        let record = self.execute_tool_call(tool_call).await;

                        let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(&tool_call.id)
                            .content(record.result.clone())
                            .build()
                            .map_err(|e| VoxsqlError::Agent(e.to_string()))?;
                        messages.push(tool_msg.into());

                        tool_calls_made.push(record);
                    }
                }
                ChatReply::Final(content) => {
                    let raw = content.unwrap_or_default();
                    let sql = extract_sql(&raw, &self.sql_fence);
                    if sql.is_empty() {
                        return Err(VoxsqlError::Agent("Model returned an empty answer".to_string()));
                    }

                    info!(iterations, tool_calls = tool_calls_made.len(), "Generated SQL");
                    return Ok(GeneratedSql {
                        sql,
                        raw,
                        tool_calls: tool_calls_made,
                        iterations,
                    });
                }
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> ToolCallRecord {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);

        let result = match parse_tool_call(name, arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
        }
    }
}

/// Strip a surrounding markdown code fence, if any.
fn extract_sql(content: &str, fence: &Regex) -> String {
    match fence.captures(content).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => content.trim().to_string(),
    }
}

/// Result of an agent run.
#[derive(Debug)]
pub struct GeneratedSql {
    /// SQL with any markdown fence removed.
    pub sql: String,
    /// The model's final message as returned.
    pub raw: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{Chunk, ChunkMetadata};
    use crate::embedding::Embedder;
    use crate::rag::testing::KeywordEmbedder;
    use crate::rag::Retriever;
    use crate::vector_store::{MemoryVectorStore, StoredChunk, VectorStore};
    use async_openai::types::{ChatCompletionToolType, FunctionCall};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned replies and records what the agent sent.
    struct ScriptedChat {
        replies: Mutex<Vec<ChatReply>>,
        seen: Mutex<Vec<usize>>,
    }

    impl ScriptedChat {
        fn new(mut replies: Vec<ChatReply>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedChat {
        async fn complete(
            &self,
            messages: &[ChatCompletionRequestMessage],
            _tools: &[ChatCompletionTool],
        ) -> Result<ChatReply> {
            self.seen.lock().unwrap().push(messages.len());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| VoxsqlError::Agent("script exhausted".to_string()))
        }
    }

    fn retrieve_call(query: &str) -> ChatReply {
        ChatReply::ToolCalls(vec![ChatCompletionMessageToolCall {
            id: "call_1".to_string(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: "retrieve_context".to_string(),
                arguments: serde_json::json!({ "query": query }).to_string(),
            },
        }])
    }

    async fn tool_context() -> ToolContext {
        let store = Arc::new(MemoryVectorStore::new());
        let content = "table: customers\ncolumn: email\ndescription: customer email";
        store
            .replace_all(vec![StoredChunk::new(
                Chunk {
                    content: content.to_string(),
                    metadata: ChunkMetadata {
                        source: "customer email".to_string(),
                        row: 0,
                        start_index: Some(0),
                    },
                },
                KeywordEmbedder.embed(content).await.unwrap(),
            )])
            .await
            .unwrap();

        ToolContext::new(Retriever::new(store, Arc::new(KeywordEmbedder), 2))
    }

    #[tokio::test]
    async fn test_tool_loop_then_sql() {
        let chat = Arc::new(ScriptedChat::new(vec![
            retrieve_call("customer email"),
            ChatReply::Final(Some("```sql\nSELECT email FROM customers;\n```".to_string())),
        ]));
        let agent = SqlAgent::new(chat.clone(), tool_context().await);

        let result = agent.generate_sql("List every customer email").await.unwrap();

        assert_eq!(result.sql, "SELECT email FROM customers;");
        assert_eq!(result.iterations, 2);
        assert_eq!(result.tool_calls.len(), 1);
        assert!(result.tool_calls[0].result.contains("table: customers"));
        // system + user, then + assistant tool call + tool result
        assert_eq!(*chat.seen.lock().unwrap(), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_bad_tool_arguments_are_reported_to_model() {
        let chat = Arc::new(ScriptedChat::new(vec![
            ChatReply::ToolCalls(vec![ChatCompletionMessageToolCall {
                id: "call_1".to_string(),
                r#type: ChatCompletionToolType::Function,
                function: FunctionCall {
                    name: "retrieve_context".to_string(),
                    arguments: "{}".to_string(),
                },
            }]),
            ChatReply::Final(Some("SELECT 1".to_string())),
        ]));
        let agent = SqlAgent::new(chat, tool_context().await);

        let result = agent.generate_sql("anything").await.unwrap();
        assert!(result.tool_calls[0].result.starts_with("Failed to parse tool call"));
        assert_eq!(result.sql, "SELECT 1");
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let chat = Arc::new(ScriptedChat::new(vec![
            retrieve_call("a"),
            retrieve_call("b"),
            retrieve_call("c"),
        ]));
        let agent = SqlAgent::new(chat, tool_context().await).with_max_iterations(2);

        let err = agent.generate_sql("loop forever").await.unwrap_err();
        assert!(err.to_string().contains("maximum iterations (2)"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_an_error() {
        let chat = Arc::new(ScriptedChat::new(vec![ChatReply::Final(None)]));
        let agent = SqlAgent::new(chat, tool_context().await);
        assert!(agent.generate_sql("q").await.is_err());
    }

    #[test]
    fn test_extract_sql() {
        let fence = Regex::new(SQL_FENCE_PATTERN).unwrap();
        assert_eq!(extract_sql("  SELECT 1;  ", &fence), "SELECT 1;");
        assert_eq!(extract_sql("```sql\nSELECT 1;\n```", &fence), "SELECT 1;");
        assert_eq!(
            extract_sql("Here you go:\n```\nSELECT *\nFROM t;\n```\nDone.", &fence),
            "SELECT *\nFROM t;"
        );
        assert_eq!(extract_sql("```SELECT 1```", &fence), "SELECT 1");
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "retrieve_context".to_string(),
            arguments: r#"{"query": "orders"}"#.to_string(),
            result: "Source: ...".to_string(),
        };
        assert_eq!(format!("{}", record), r#"retrieve_context({"query": "orders"})"#);
    }
}
