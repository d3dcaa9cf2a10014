//! HTTP API server.
//!
//! Exposes the text-to-SQL pipeline to browser clients. Every caller works
//! inside a session: it sets an API key (which creates the session), uploads
//! a schema, then converts questions.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/` | Service banner |
//! | `GET`    | `/health` | Health check (version, live session count) |
//! | `POST`   | `/api/set-api-key` | Set the credential; creates or reuses a session |
//! | `POST`   | `/api/upload-schema?session_id=` | Multipart `.json` schema upload |
//! | `POST`   | `/api/convert` | Convert a question to SQL |
//! | `GET`    | `/api/history/{session_id}` | Recent conversions, newest first |
//! | `GET`    | `/api/session/{session_id}` | Session state and creation time |
//! | `DELETE` | `/api/session/{session_id}` | Drop a session and its index |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "schema_not_loaded", "message": "Schema must be loaded before converting queries" } }
//! ```
//!
//! Client mistakes (`bad_request`, `missing_credential`, `schema_not_loaded`,
//! `schema_format`, `schema_parse`, `invalid_session`) map to 400, an
//! oversize upload to 413, upstream service failures (`embedding_error`,
//! `completion_error`) to 502, `timeout` to 504 and `search_error` to 500.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use text2sql_core::models::HistoryEntry;
use text2sql_core::schema::parse_schema_bytes;
use text2sql_core::session::{Credential, ProviderFactory, SessionInfo};

use crate::config::{Config, ServerConfig};
use crate::openai::OpenAiFactory;
use crate::registry::SessionRegistry;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    sessions: Arc<SessionRegistry>,
    providers: Arc<dyn ProviderFactory>,
}

impl AppState {
    pub fn new(config: Arc<Config>, providers: Arc<dyn ProviderFactory>) -> Self {
        let idle = config.sessions.idle_timeout_secs;
        let sessions = Arc::new(SessionRegistry::new(
            config.pipeline_settings(),
            config.sessions.history_limit,
            (idle > 0).then(|| Duration::from_secs(idle)),
        ));
        Self {
            config,
            sessions,
            providers,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }
}

/// Build the router with CORS, request tracing and the upload size limit.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config.server)?;
    let upload_limit = state.config.server.max_upload_bytes;

    let router = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/set-api-key", post(handle_set_api_key))
        .route(
            "/api/upload-schema",
            post(handle_upload_schema).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/convert", post(handle_convert))
        .route("/api/history/{session_id}", get(handle_history))
        .route(
            "/api/session/{session_id}",
            get(handle_session_info).delete(handle_delete_session),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);
    Ok(router)
}

fn cors_layer(server: &ServerConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.cors_origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }
    let origins = server
        .cors_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| anyhow::anyhow!("invalid CORS origin in server.cors_origins: {}", o))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(layer.allow_origin(origins))
}

/// Starts the HTTP server on `[server].bind` with OpenAI-backed sessions.
///
/// Runs until the process is terminated. Idle sessions are swept in the
/// background every `sessions.sweep_interval_secs`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let config = Arc::new(config.clone());
    let providers = Arc::new(OpenAiFactory::new(config.clone())?);
    let state = AppState::new(config.clone(), providers);

    if config.sessions.idle_timeout_secs > 0 {
        state
            .sessions()
            .clone()
            .spawn_reaper(Duration::from_secs(config.sessions.sweep_interval_secs.max(1)));
    }

    let app = build_router(state)?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        embedding_model = %config.embedding.model,
        completion_model = %config.completion.model,
        "Text-to-SQL API listening"
    );
    println!("Text-to-SQL API listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<text2sql_core::Error> for AppError {
    fn from(err: text2sql_core::Error) -> Self {
        use text2sql_core::Error as E;
        let status = match &err {
            E::MissingCredential
            | E::SchemaNotLoaded
            | E::SchemaFormat(_)
            | E::SchemaParse { .. }
            | E::InvalidSession(_) => StatusCode::BAD_REQUEST,
            E::EmbeddingService(_) | E::Completion(_) => StatusCode::BAD_GATEWAY,
            E::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            E::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!(code = err.code(), error = %err, "Request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "bad_request"
        };
        AppError {
            status,
            code: code.to_string(),
            message: err.body_text(),
        }
    }
}

// ============ GET / and GET /health ============

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Text-to-SQL API is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.len(),
    })
}

// ============ POST /api/set-api-key ============

#[derive(Deserialize)]
struct SetApiKeyRequest {
    api_key: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: String,
    message: String,
}

async fn handle_set_api_key(
    State(state): State<AppState>,
    payload: Result<Json<SetApiKeyRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    if req.api_key.trim().is_empty() {
        return Err(bad_request("api_key must not be empty"));
    }

    let (session_id, handle) = state.sessions.get_or_create(req.session_id.as_deref());
    let mut session = handle.lock().await;
    session.set_credential(Credential::new(req.api_key), state.providers.as_ref())?;

    Ok(Json(SessionResponse {
        session_id,
        message: "API key set successfully".to_string(),
    }))
}

// ============ POST /api/upload-schema ============

#[derive(Deserialize)]
struct UploadParams {
    session_id: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    session_id: String,
    message: String,
    tables: usize,
    fragments: usize,
}

async fn handle_upload_schema(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let session_id = params
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| bad_request("session_id query parameter is required"))?;
    let handle = state.sessions.get(&session_id)?;
    let mut multipart = multipart.map_err(|e| bad_request(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if !file_name.to_ascii_lowercase().ends_with(".json") {
            return Err(bad_request("Only JSON files are supported"));
        }
        upload = Some(field.bytes().await?);
        break;
    }
    let bytes = upload.ok_or_else(|| bad_request("multipart field 'file' is required"))?;

    let schema = parse_schema_bytes(&bytes)?;
    let mut session = handle.lock().await;
    let report = session.load_schema(&schema).await?;

    Ok(Json(UploadResponse {
        session_id,
        message: format!("Schema loaded successfully with {} tables", report.tables),
        tables: report.tables,
        fragments: report.fragments,
    }))
}

// ============ POST /api/convert ============

#[derive(Deserialize)]
struct ConvertRequest {
    question: String,
    session_id: String,
}

async fn handle_convert(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<HistoryEntry>, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let handle = state.sessions.get(&req.session_id)?;
    let mut session = handle.lock().await;
    let entry = session.convert(&req.question).await?;
    Ok(Json(entry))
}

// ============ GET /api/history/{session_id} ============

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

async fn handle_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let handle = state.sessions.get(&session_id)?;
    let session = handle.lock().await;
    Ok(Json(HistoryResponse {
        history: session.history(),
    }))
}

// ============ GET /api/session/{session_id} ============

async fn handle_session_info(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, AppError> {
    let handle = state.sessions.get(&session_id)?;
    let session = handle.lock().await;
    Ok(Json(session.info()))
}

// ============ DELETE /api/session/{session_id} ============

async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    if !state.sessions.remove(&session_id) {
        return Err(text2sql_core::Error::InvalidSession(session_id).into());
    }
    Ok(Json(SessionResponse {
        session_id,
        message: "Session deleted".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use text2sql_core::Error;

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (Error::MissingCredential, StatusCode::BAD_REQUEST),
            (Error::SchemaNotLoaded, StatusCode::BAD_REQUEST),
            (Error::SchemaFormat("x".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidSession("x".into()), StatusCode::BAD_REQUEST),
            (Error::EmbeddingService("x".into()), StatusCode::BAD_GATEWAY),
            (Error::Completion("x".into()), StatusCode::BAD_GATEWAY),
            (Error::Search("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::Timeout {
                    service: "completion",
                    secs: 60,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            let code = err.code();
            let app: AppError = err.into();
            assert_eq!(app.status, status);
            assert_eq!(app.code, code);
        }
    }

    #[test]
    fn test_cors_rejects_invalid_origin() {
        let server = ServerConfig {
            cors_origins: vec!["http://ok.example".to_string(), "bad\norigin".to_string()],
            ..Default::default()
        };
        assert!(cors_layer(&server).is_err());
    }

    #[test]
    fn test_cors_wildcard() {
        let server = ServerConfig {
            cors_origins: vec!["*".to_string()],
            ..Default::default()
        };
        assert!(cors_layer(&server).is_ok());
    }
}
