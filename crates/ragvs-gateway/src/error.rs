use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ragvs_core::{IngestError, RagError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Server(String),
}

/// Error response rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let status = match &err {
            RagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RagError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            RagError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            RagError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        if !err.committed.is_empty() {
            tracing::warn!(
                committed = err.committed.len(),
                "ingestion aborted after partial commit"
            );
        }
        err.error.into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}
