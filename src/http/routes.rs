use std::future::Future;
use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::PredictionResult;
use crate::config::CLASS_NAMES;
use crate::context::AppContext;
use crate::error::{log_pipeline_error, ErrorCode};

use super::upload::{allowed_file, TempUpload};

const NO_FILE_PART: &str = "No file part in the request";
const NO_SELECTED_FILE: &str = "No selected file";
const UNSUPPORTED_EXTENSION: &str = "Unsupported file extension";

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    BadRequest(&'static str),
    /// Multipart stream broke mid-request (size limit, malformed body)
    Rejected(StatusCode, String),
    InferenceFailed(String),
    Internal(String),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            Self::Rejected(status, msg) => (status, msg),
            Self::InferenceFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Inference failed: {}", msg),
            ),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub classes: &'static [&'static str],
    pub uptime_ms: u64,
}

/// Build the Axum router with all handlers.
pub fn build_router(context: AppContext) -> Router {
    let body_limit = context.config().max_upload_bytes;
    Router::new()
        .route("/", get(hello))
        .route("/healthz", get(healthz))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(context)
}

/// Run the HTTP server loop until `shutdown` resolves.
pub async fn run_http_server<F>(
    context: AppContext,
    addr: SocketAddr,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP listener on {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, build_router(context))
        .with_graceful_shutdown(shutdown)
        .await
        .context("serving HTTP router")?;
    Ok(())
}

pub async fn hello() -> &'static str {
    "Hello, World!"
}

pub async fn healthz(State(context): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: context.pipeline().classifier().describe(),
        classes: &CLASS_NAMES,
        uptime_ms: context.uptime_ms(),
    })
}

pub async fn predict(
    State(context): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, HttpServerError> {
    let mut multipart = multipart.map_err(|_| HttpServerError::BadRequest(NO_FILE_PART))?;
    let (filename, bytes) = read_file_field(&mut multipart).await?;

    if filename.is_empty() {
        return Err(HttpServerError::BadRequest(NO_SELECTED_FILE));
    }
    if !allowed_file(&filename) {
        return Err(HttpServerError::BadRequest(UNSUPPORTED_EXTENSION));
    }

    let upload = TempUpload::create(&context.config().upload_dir, &filename, &bytes)
        .map_err(|err| HttpServerError::Internal(format!("Failed to store upload: {}", err)))?;
    drop(bytes);

    let pipeline = context.pipeline();
    let (result, cleanup) = tokio::task::spawn_blocking(move || {
        let result = pipeline.predict_file(upload.path());
        let path = upload.path().to_path_buf();
        let cleanup = upload.remove().map_err(|err| (path, err));
        (result, cleanup)
    })
    .await
    .map_err(|err| HttpServerError::InferenceFailed(err.to_string()))?;

    if let Err((path, err)) = cleanup {
        warn!(path = %path.display(), "failed to remove upload: {}", err);
    }

    match result {
        Ok(prediction) => Ok(Json(prediction)),
        Err(err) => {
            log_pipeline_error(&err, &filename);
            Err(HttpServerError::InferenceFailed(err.message()))
        }
    }
}

/// Find the first `file` part that carries a filename and read it whole.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<(String, axum::body::Bytes), HttpServerError> {
    while let Some(field) = multipart.next_field().await.map_err(rejected)? {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let bytes = field.bytes().await.map_err(rejected)?;
        return Ok((filename, bytes));
    }

    Err(HttpServerError::BadRequest(NO_FILE_PART))
}

fn rejected(err: axum::extract::multipart::MultipartError) -> HttpServerError {
    HttpServerError::Rejected(err.status(), err.body_text())
}
