//! Speech-to-text transcription.
//!
//! Audio is sent to an OpenAI-compatible Whisper endpoint (Groq by default) and
//! the segment texts come back concatenated into a single transcript.

mod whisper;

pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Audio file extensions accepted for transcription.
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file and return its full text.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Check whether a file name carries a supported audio extension.
pub fn is_supported_audio(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
