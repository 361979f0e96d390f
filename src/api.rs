//! HTTP surface for LedgerLens.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Liveness message.
//! - `POST /analyze` – Multipart upload with a required `file` field (PDF) and an optional
//!   `query` field. The upload is stored under a generated transient name, analyzed by the
//!   Verifier → Analyst → RiskAssessor → Advisor sequence, and deleted before the response is
//!   returned. Success returns `{ status, query, analysis, file_processed }`.
//! - `GET /metrics` – Analysis counters.
//!
//! Every failure renders as `{ "status": "error", "detail": ... }` with a status code chosen by
//! error kind; no partial analysis is ever returned.

use crate::llm::LlmClientError;
use crate::logging::preview;
use crate::metrics::MetricsSnapshot;
use crate::processing::{AnalysisApi, AnalysisError, AnalysisQuery, DispatchError};
use crate::upload::{TransientDocument, TransientStore};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Shared handler state: the analysis pipeline and the transient upload directory.
pub struct AppState<S> {
    service: Arc<S>,
    store: Arc<TransientStore>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            store: Arc::clone(&self.store),
        }
    }
}

/// Build the HTTP router exposing the analysis API surface.
pub fn create_router<S>(service: Arc<S>, store: Arc<TransientStore>, max_upload_bytes: usize) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/analyze", post(analyze_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(AppState { service, store })
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "LedgerLens financial document analyzer is running",
    })
}

/// Success response for the `POST /analyze` endpoint.
#[derive(Serialize)]
struct AnalyzeResponse {
    status: &'static str,
    query: String,
    analysis: String,
    file_processed: String,
}

/// Analyze an uploaded document.
///
/// The transient file is owned by the `TransientDocument` guard for the rest of the handler and
/// removed when it goes out of scope, whatever the outcome.
async fn analyze_document<S>(
    State(state): State<AppState<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError>
where
    S: AnalysisApi,
{
    let mut multipart = multipart?;
    let mut document: Option<TransientDocument> = None;
    let mut query: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") if document.is_none() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let (mut upload, mut file) = state
                    .store
                    .create(&filename)
                    .await
                    .map_err(ApiError::Storage)?;
                while let Some(chunk) = field.chunk().await? {
                    file.write_all(&chunk).await.map_err(ApiError::Storage)?;
                    upload.record_written(chunk.len());
                }
                file.flush().await.map_err(ApiError::Storage)?;

                // Browsers submit an empty, unnamed part when no file was chosen.
                if filename.is_empty() && upload.size_bytes() == 0 {
                    continue;
                }
                document = Some(upload);
            }
            Some("query") => query = Some(field.text().await?),
            _ => {}
        }
    }

    let document = document.ok_or(ApiError::MissingFile)?;
    let query = AnalysisQuery::from_input(query);
    tracing::info!(
        file = document.original_filename(),
        bytes = document.size_bytes(),
        query = %preview(query.as_str()),
        "Analyze request received"
    );

    let result = state.service.analyze(&document, &query).await?;
    Ok(Json(AnalyzeResponse {
        status: "success",
        query: result.query,
        analysis: result.analysis,
        file_processed: result.file_processed,
    }))
}

/// Return the analysis counters.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: AnalysisApi,
{
    Json(state.service.metrics_snapshot())
}

/// Error envelope rendered for every failed request.
#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    detail: String,
}

/// Failures surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request carried no `file` field.
    #[error("No file uploaded; send the document in the `file` form field")]
    MissingFile,
    /// The request is not a multipart form (wrong content type or missing boundary).
    #[error("Invalid multipart request: {0}")]
    MultipartRejected(#[from] MultipartRejection),
    /// The multipart body could not be read.
    #[error("Invalid multipart request: {0}")]
    Multipart(#[from] MultipartError),
    /// The upload could not be written to transient storage.
    #[error("Failed to store uploaded file: {0}")]
    Storage(std::io::Error),
    /// The analysis pipeline failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingFile => StatusCode::BAD_REQUEST,
            Self::MultipartRejected(rejection) => rejection.status(),
            Self::Multipart(error) => error.status(),
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Analysis(AnalysisError::DocumentRead(_) | AnalysisError::EmptyDocument { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Analysis(AnalysisError::Dispatch(DispatchError::Stage { source, .. })) => {
                match source {
                    LlmClientError::Auth(_) | LlmClientError::InvalidResponse(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    LlmClientError::Transient(_) | LlmClientError::Timeout(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                }
            }
            Self::Analysis(AnalysisError::Dispatch(DispatchError::NoInstructions)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Caller-facing message; never includes storage paths or provider bodies.
    fn detail(&self) -> String {
        match self {
            Self::MissingFile => self.to_string(),
            Self::MultipartRejected(rejection) => {
                format!("Invalid multipart request: {}", rejection.body_text())
            }
            Self::Multipart(error) if error.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                "Uploaded file exceeds the maximum upload size".to_string()
            }
            Self::Multipart(error) => format!("Invalid multipart request: {}", error.body_text()),
            Self::Storage(_) => "Failed to store uploaded file".to_string(),
            Self::Analysis(AnalysisError::DocumentRead(error)) => {
                format!("Could not read the uploaded document: {}", error.reason())
            }
            Self::Analysis(AnalysisError::EmptyDocument { filename }) => {
                format!("Document '{filename}' contains no extractable text")
            }
            Self::Analysis(AnalysisError::Dispatch(DispatchError::Stage { role, source, .. })) => {
                let reason = match source {
                    LlmClientError::Auth(_) => "the provider rejected the configured credentials",
                    LlmClientError::Transient(_) => {
                        "the provider is temporarily unavailable; retries were exhausted"
                    }
                    LlmClientError::Timeout(_) => "the provider did not respond in time",
                    LlmClientError::InvalidResponse(_) => "the provider returned an unusable response",
                };
                format!("Analysis failed during the {role} stage: {reason}")
            }
            Self::Analysis(AnalysisError::Dispatch(DispatchError::NoInstructions)) => {
                "Analysis failed: no role instructions were produced".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Analyze request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Analyze request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                status: "error",
                detail: self.detail(),
            }),
        )
            .into_response()
    }
}
