//! Endpoint handlers.

use super::error::ApiError;
use super::upload::{is_csv, read_form};
use super::AppState;
use crate::transcription::is_supported_audio;
use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const NO_FILE: &str = "No file provided";
const NO_CSV_FILE: &str = "No CSV file provided";
const INVALID_AUDIO: &str = "Invalid format. Allowed: mp3, wav, ogg, m4a, flac";
const NOT_CSV: &str = "File must be CSV";
const QUERY_REQUIRED: &str = "Query required";
const LOAD_CSV_FIRST: &str = "Load CSV first";

const DEFAULT_SOURCE_COLUMN: &str = "description";

// === Request/Response Types ===

#[derive(Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

impl QueryRequest {
    fn query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Serialize)]
pub struct TranscribeResponse {
    transcribed_text: String,
}

#[derive(Serialize)]
pub struct LoadCsvResponse {
    message: &'static str,
    documents_loaded: usize,
    document_chunks: usize,
}

#[derive(Serialize)]
pub struct RetrieveContextResponse {
    context: String,
    documents_count: usize,
}

#[derive(Serialize)]
pub struct GenerateSqlResponse {
    natural_language_query: String,
    generated_sql: String,
}

// === Handlers ===

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "voxsql API is running",
    })
}

pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "voxsql API",
        "endpoints": {
            "GET /health": "Health check",
            "POST /transcribe": "Transcribe audio (multipart: file)",
            "POST /load-csv": "Load CSV (multipart: file, source_column optional, groq_api_key optional)",
            "POST /retrieve-context": "Retrieve context (json: {query})",
            "POST /generate-sql": "Generate SQL (json: {query})"
        }
    }))
}

pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request(NO_FILE))?;

    let form = read_form(&mut multipart, &state.temp_dir, is_supported_audio)
        .await
        .map_err(|e| ApiError::from_upload(e, INVALID_AUDIO, NO_FILE))?;
    let upload = form.file.ok_or_else(|| ApiError::bad_request(NO_FILE))?;

    info!(file = %upload.original_name, size = upload.size, "Transcribing upload");

    let transcriber = state.transcriber()?;
    let text = transcriber.transcribe(upload.path()).await?;

    Ok(Json(TranscribeResponse {
        transcribed_text: text,
    }))
}

pub async fn load_csv(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<LoadCsvResponse>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request(NO_CSV_FILE))?;

    let form = read_form(&mut multipart, &state.temp_dir, is_csv)
        .await
        .map_err(|e| ApiError::from_upload(e, NOT_CSV, NO_CSV_FILE))?;

    // Absent means the default column; an empty value means "use the file name".
    let source_column = match form.fields.get("source_column") {
        None => Some(DEFAULT_SOURCE_COLUMN.to_string()),
        Some(v) if v.trim().is_empty() => None,
        Some(v) => Some(v.trim().to_string()),
    };
    let api_key = form.field("groq_api_key").map(str::to_string);
    let upload = form.file.ok_or_else(|| ApiError::bad_request(NO_CSV_FILE))?;

    info!(file = %upload.original_name, size = upload.size, "Loading CSV upload");

    let result = state
        .load_csv(upload.path(), source_column.as_deref(), api_key.as_deref())
        .await?;

    Ok(Json(LoadCsvResponse {
        message: "CSV loaded successfully",
        documents_loaded: result.documents_loaded,
        document_chunks: result.document_chunks,
    }))
}

pub async fn retrieve_context(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<RetrieveContextResponse>, ApiError> {
    let Json(req) = payload?;
    let query = req.query().ok_or_else(|| ApiError::bad_request(QUERY_REQUIRED))?;

    let context = state.orchestrator.retrieve_context(query).await?;

    Ok(Json(RetrieveContextResponse {
        documents_count: context.len(),
        context: context.serialized,
    }))
}

pub async fn generate_sql(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<GenerateSqlResponse>, ApiError> {
    let agent = state
        .current_agent()
        .await
        .ok_or_else(|| ApiError::bad_request(LOAD_CSV_FIRST))?;

    let Json(req) = payload?;
    let query = req.query().ok_or_else(|| ApiError::bad_request(QUERY_REQUIRED))?;

    let generated = agent.generate_sql(query).await?;

    Ok(Json(GenerateSqlResponse {
        natural_language_query: query.to_string(),
        generated_sql: generated.sql,
    }))
}
