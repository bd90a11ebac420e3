//! Multipart upload handling.
//!
//! The `file` part is streamed into a named temporary file that is removed
//! when the [`TempUpload`] is dropped. Other parts are collected as text.

use axum::extract::multipart::{Multipart, MultipartError};
use std::collections::HashMap;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Name of the multipart part carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// An uploaded file on disk, deleted on drop.
#[derive(Debug)]
pub struct TempUpload {
    /// File name as sent by the client.
    pub original_name: String,
    /// Bytes written.
    pub size: u64,
    file: NamedTempFile,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Parsed multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<TempUpload>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Text field value, treating empty strings as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Why a form could not be read.
#[derive(Debug)]
pub enum UploadError {
    /// The file name failed the caller's check.
    Rejected(String),
    Multipart(MultipartError),
    Io(std::io::Error),
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        UploadError::Multipart(e)
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::Io(e)
    }
}

/// Read every part of `multipart`.
///
/// A `file` part without a file name is ignored, so the caller sees it as
/// missing. A named file that `accept` refuses aborts the read before any
/// bytes are written.
pub async fn read_form(
    multipart: &mut Multipart,
    temp_dir: &Path,
    accept: impl Fn(&str) -> bool,
) -> Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        if name != FILE_FIELD {
            let value = field.text().await?;
            form.fields.insert(name, value);
            continue;
        }

        let original_name = match field.file_name() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => continue,
        };

        if !accept(&original_name) {
            return Err(UploadError::Rejected(original_name));
        }

        let suffix = Path::new(&original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();

        tokio::fs::create_dir_all(temp_dir).await?;
        let file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(temp_dir)?;

        let mut out = tokio::fs::File::from_std(file.as_file().try_clone()?);
        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            out.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        out.flush().await?;

        debug!(original_name = %original_name, size, path = %file.path().display(), "Saved upload");

        form.file = Some(TempUpload {
            original_name,
            size,
            file,
        });
    }

    Ok(form)
}

/// Check whether a file name has a `.csv` extension.
pub fn is_csv(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_csv() {
        assert!(is_csv("schema.csv"));
        assert!(is_csv("SCHEMA.CSV"));
        assert!(!is_csv("schema.csv.txt"));
        assert!(!is_csv("csv"));
        assert!(!is_csv("schema.tsv"));
    }

    #[test]
    fn test_empty_field_is_absent() {
        let mut form = UploadForm::default();
        form.fields.insert("source_column".to_string(), "".to_string());
        form.fields.insert("groq_api_key".to_string(), "gsk-1".to_string());

        assert_eq!(form.field("source_column"), None);
        assert_eq!(form.field("groq_api_key"), Some("gsk-1"));
        assert_eq!(form.field("missing"), None);
    }
}
