//! HTTP API for voice-to-SQL.
//!
//! Exposes transcription, CSV loading, context retrieval and SQL generation
//! over a small JSON/multipart API.

mod error;
mod handlers;
mod upload;

pub use error::ApiError;
pub use upload::{is_csv, read_form, TempUpload, UploadError, UploadForm};

use crate::agent::{ChatBackend, SqlAgent};
use crate::config::Settings;
use crate::error::{Result, VoxsqlError};
use crate::orchestrator::{LoadResult, Orchestrator};
use crate::transcription::{Transcriber, WhisperTranscriber};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    settings: Settings,
    orchestrator: Orchestrator,
    transcriber: Option<Arc<dyn Transcriber>>,
    chat_backend: Option<Arc<dyn ChatBackend>>,
    agent: RwLock<Option<Arc<SqlAgent>>>,
    load_lock: Mutex<()>,
    temp_dir: PathBuf,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// The transcriber is only created when an API key is available at
    /// startup; without one, transcription requests fail until restart.
    pub fn new(settings: Settings) -> Result<Self> {
        let orchestrator = Orchestrator::new(settings.clone())?;

        let transcriber: Option<Arc<dyn Transcriber>> = match settings.resolve_api_key(None) {
            Some(key) => Some(Arc::new(WhisperTranscriber::new(
                &settings.provider,
                &settings.transcription,
                &key,
            )?)),
            None => {
                warn!(
                    "{} is not set; /transcribe is disabled until a key is configured",
                    settings.provider.api_key_env
                );
                None
            }
        };

        Ok(Self::with_components(settings, orchestrator, transcriber, None))
    }

    /// Build state from explicit components.
    ///
    /// When `chat_backend` is set, every loaded CSV gets an agent on top of
    /// it and no provider key is required.
    pub fn with_components(
        settings: Settings,
        orchestrator: Orchestrator,
        transcriber: Option<Arc<dyn Transcriber>>,
        chat_backend: Option<Arc<dyn ChatBackend>>,
    ) -> Self {
        let temp_dir = settings.temp_dir();
        Self {
            settings,
            orchestrator,
            transcriber,
            chat_backend,
            agent: RwLock::new(None),
            load_lock: Mutex::new(()),
            temp_dir,
        }
    }

    /// The SQL agent for the most recently loaded CSV, if any.
    pub async fn current_agent(&self) -> Option<Arc<SqlAgent>> {
        self.agent.read().await.clone()
    }

    fn transcriber(&self) -> Result<Arc<dyn Transcriber>> {
        self.transcriber.clone().ok_or_else(|| {
            VoxsqlError::Config(format!(
                "No API key configured. Set {} to enable transcription.",
                self.settings.provider.api_key_env
            ))
        })
    }

    /// Index a CSV and swap in a fresh agent.
    ///
    /// Loads are serialized. The previous index and agent stay in place if
    /// anything fails before the swap.
    pub async fn load_csv(
        &self,
        path: &Path,
        source_column: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<LoadResult> {
        let _guard = self.load_lock.lock().await;

        // The agent reads through the shared store, so it can be built first.
        let agent = match &self.chat_backend {
            Some(chat) => self.orchestrator.build_agent_with(chat.clone()),
            None => {
                let key = self.settings.resolve_api_key(api_key).ok_or_else(|| {
                    VoxsqlError::Config(format!(
                        "No API key provided. Pass groq_api_key or set {}.",
                        self.settings.provider.api_key_env
                    ))
                })?;
                self.orchestrator.build_agent(&key)?
            }
        };

        let result = self.orchestrator.load_csv(path, source_column).await?;
        *self.agent.write().await = Some(Arc::new(agent));

        info!(
            documents = result.documents_loaded,
            chunks = result.document_chunks,
            "SQL agent ready"
        );

        Ok(result)
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let max_upload = state.settings.server.max_upload_bytes;
    let cors = state.settings.server.cors;

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/transcribe", post(handlers::transcribe))
        .route("/load-csv", post(handlers::load_csv))
        .route("/retrieve-context", post(handlers::retrieve_context))
        .route("/generate-sql", post(handlers::generate_sql))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&state.temp_dir).await?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ChatReply;
    use crate::rag::testing::KeywordEmbedder;
    use crate::vector_store::MemoryVectorStore;
    use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionTool};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Mutex as StdMutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "voxsql-test-boundary";

    /// Answers every question with the same SQL.
    struct FixedChat(&'static str);

    #[async_trait]
    impl ChatBackend for FixedChat {
        async fn complete(
            &self,
            _messages: &[ChatCompletionRequestMessage],
            _tools: &[ChatCompletionTool],
        ) -> Result<ChatReply> {
            Ok(ChatReply::Final(Some(self.0.to_string())))
        }
    }

    /// Records the path it was given and whether the file existed then.
    #[derive(Default)]
    struct StubTranscriber {
        seen: StdMutex<Option<(PathBuf, bool)>>,
    }

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<String> {
            *self.seen.lock().unwrap() = Some((audio_path.to_path_buf(), audio_path.exists()));
            Ok("show me all orders".to_string())
        }
    }

    struct Fixture {
        app: Router,
        transcriber: Arc<StubTranscriber>,
        temp: tempfile::TempDir,
    }

    fn fixture(with_transcriber: bool) -> Fixture {
        fixture_with(with_transcriber, |_| {})
    }

    fn fixture_with(with_transcriber: bool, configure: impl FnOnce(&mut Settings)) -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.temp_dir = temp.path().to_string_lossy().to_string();
        configure(&mut settings);

        let orchestrator = Orchestrator::with_components(
            settings.clone(),
            Arc::new(KeywordEmbedder),
            Arc::new(MemoryVectorStore::new()),
        )
        .unwrap();

        let transcriber = Arc::new(StubTranscriber::default());
        let state = AppState::with_components(
            settings,
            orchestrator,
            with_transcriber.then(|| transcriber.clone() as Arc<dyn Transcriber>),
            Some(Arc::new(FixedChat("```sql\nSELECT * FROM orders;\n```"))),
        );

        Fixture {
            app: router(Arc::new(state)),
            transcriber,
            temp,
        }
    }

    enum Part<'a> {
        File(&'a str, &'a [u8]),
        Text(&'a str, &'a str),
    }

    fn multipart(uri: &str, parts: &[Part]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File(name, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n",
                            name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value)
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    const SCHEMA_CSV: &[u8] = b"table,column,description\n\
        orders,total,Order total in cents\n\
        customers,email,Customer email address\n\
        products,name,Product display name\n";

    #[tokio::test]
    async fn test_health() {
        let f = fixture(true);
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let f = fixture(true);
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["endpoints"]["POST /generate-sql"].is_string());
    }

    #[tokio::test]
    async fn test_transcribe_removes_temp_file() {
        let f = fixture(true);
        let req = multipart("/transcribe", &[Part::File("question.MP3", b"ID3fake")]);
        let (status, body) = send(&f.app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transcribed_text"], "show me all orders");

        let (path, existed) = f.transcriber.seen.lock().unwrap().clone().unwrap();
        assert!(existed);
        assert_eq!(path.extension().unwrap(), "mp3");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_transcribe_validation() {
        let f = fixture(true);

        let (status, body) = send(&f.app, multipart("/transcribe", &[])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file provided");

        let (status, body) =
            send(&f.app, multipart("/transcribe", &[Part::File("", b"data")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file provided");

        let (status, body) =
            send(&f.app, multipart("/transcribe", &[Part::File("notes.txt", b"data")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid format. Allowed: mp3, wav, ogg, m4a, flac");

        let req = json("/transcribe", serde_json::json!({}));
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file provided");

        assert!(f.transcriber.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transcribe_without_key_is_internal_error() {
        let f = fixture(false);
        let req = multipart("/transcribe", &[Part::File("q.wav", b"RIFF")]);
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("No API key configured"));
    }

    #[tokio::test]
    async fn test_load_csv_validation() {
        let f = fixture(true);

        let (status, body) = send(&f.app, multipart("/load-csv", &[])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No CSV file provided");

        let req = multipart("/load-csv", &[Part::File("schema.xlsx", b"PK")]);
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "File must be CSV");
    }

    #[tokio::test]
    async fn test_load_csv_missing_column_is_internal_error() {
        let f = fixture(true);
        let req = multipart(
            "/load-csv",
            &[
                Part::File("schema.csv", SCHEMA_CSV),
                Part::Text("source_column", "notes"),
            ],
        );
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("Source column 'notes' not found"));
    }

    #[tokio::test]
    async fn test_generate_sql_requires_loaded_csv() {
        let f = fixture(true);

        let (status, body) = send(&f.app, json("/generate-sql", serde_json::json!({"query": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Load CSV first");
    }

    #[tokio::test]
    async fn test_load_retrieve_and_generate() {
        let f = fixture(true);

        let req = multipart(
            "/load-csv",
            &[
                Part::File("schema.csv", SCHEMA_CSV),
                Part::Text("source_column", "description"),
                Part::Text("groq_api_key", ""),
            ],
        );
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "CSV loaded successfully");
        assert_eq!(body["documents_loaded"], 3);
        assert_eq!(body["document_chunks"], 3);

        let req = json("/retrieve-context", serde_json::json!({"query": "customer email"}));
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["documents_count"], 2);
        assert!(body["context"].as_str().unwrap().contains("Customer email address"));

        let (status, body) = send(&f.app, json("/retrieve-context", serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query required");

        let (status, body) = send(&f.app, json("/generate-sql", serde_json::json!({"query": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query required");

        let req = json("/generate-sql", serde_json::json!({"query": "show me all orders"}));
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["natural_language_query"], "show me all orders");
        assert_eq!(body["generated_sql"], "SELECT * FROM orders;");
    }

    #[tokio::test]
    async fn test_retrieve_before_load_is_empty() {
        let f = fixture(true);
        let req = json("/retrieve-context", serde_json::json!({"query": "orders"}));
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["documents_count"], 0);
        assert_eq!(body["context"], "");
    }

    #[tokio::test]
    async fn test_oversized_uploads_are_rejected() {
        let f = fixture_with(true, |s| s.server.max_upload_bytes = 1024);
        let payload = vec![b'a'; 8 * 1024];

        let req = multipart("/transcribe", &[Part::File("q.mp3", &payload)]);
        let (status, body) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
        assert!(f.transcriber.seen.lock().unwrap().is_none());

        let req = multipart(
            "/load-csv",
            &[
                Part::File("schema.csv", &payload),
                Part::Text("groq_api_key", "gsk-test"),
            ],
        );
        let (status, _) = send(&f.app, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        assert_eq!(std::fs::read_dir(f.temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_query_is_rejected() {
        let f = fixture_with(true, |s| s.server.max_upload_bytes = 1024);
        let query = "orders ".repeat(8 * 1024 / 7);

        let (status, body) = send(
            &f.app,
            json("/retrieve-context", serde_json::json!({ "query": query })),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].is_string());
    }
}
