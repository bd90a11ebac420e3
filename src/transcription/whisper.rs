//! Whisper transcription over an OpenAI-compatible API.

use super::Transcriber;
use crate::config::{ProviderSettings, TranscriptionSettings};
use crate::error::{Result, VoxsqlError};
use crate::openai::{create_client, ProviderClient};
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: ProviderClient,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a transcriber from configuration.
    pub fn new(
        provider: &ProviderSettings,
        settings: &TranscriptionSettings,
        api_key: &str,
    ) -> Result<Self> {
        Ok(Self {
            client: create_client(provider, api_key)?,
            model: settings.model.clone(),
            language: settings.language.clone(),
        })
    }

    /// Model name sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display(), model = %self.model))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| VoxsqlError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| VoxsqlError::Provider(format!("Whisper API error: {}", e)))?;

        let text = response.text.trim().to_string();
        debug!(chars = text.len(), "Transcription complete");
        Ok(text)
    }
}
