//! Chat-completion backend used by the agent loop.

use crate::config::{LlmSettings, ProviderSettings};
use crate::error::{Result, VoxsqlError};
use crate::openai::{create_client, ProviderClient};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestMessage, ChatCompletionTool,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay before the first retry; doubles on each further attempt.
const RETRY_BASE_DELAY_MS: u64 = 500;

/// What the model produced for one turn.
#[derive(Debug, Clone)]
pub enum ChatReply {
    /// The model asked for tools to be run.
    ToolCalls(Vec<ChatCompletionMessageToolCall>),
    /// The model answered.
    Final(Option<String>),
}

/// A model that can take a conversation plus tool definitions and reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ChatReply>;
}

/// Chat backend for an OpenAI-compatible provider.
pub struct ProviderChat {
    client: ProviderClient,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl ProviderChat {
    pub fn new(provider: &ProviderSettings, llm: &LlmSettings, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(provider, api_key)?,
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_retries: llm.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete_once(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ChatReply> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages.to_vec())
            .tools(tools.to_vec())
            .temperature(self.temperature)
            .build()
            .map_err(|e| VoxsqlError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| VoxsqlError::Provider(format!("Chat API error: {}", e)))?;

        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| VoxsqlError::Agent("No response from model".to_string()))?
            .message;

        match message.tool_calls {
            Some(calls) if !calls.is_empty() => Ok(ChatReply::ToolCalls(calls)),
            _ => Ok(ChatReply::Final(message.content)),
        }
    }
}

#[async_trait]
impl ChatBackend for ProviderChat {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ChatReply> {
        let mut attempt = 0;
        loop {
            match self.complete_once(messages, tools).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.max_retries => {
                    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS << attempt);
                    warn!(attempt = attempt + 1, error = %e, "Chat request failed, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("Chat request failed after {} retries", attempt);
                    return Err(e);
                }
            }
        }
    }
}
