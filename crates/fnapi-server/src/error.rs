use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use fnapi_hooks::HookError;
use fnapi_store::{ErrorKind, StoreError};

#[derive(Debug, Error)]
pub enum ServerError {
    /// The request itself is unusable (bad JSON, mismatched identifiers).
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        Self::Hook(HookError::Store(err))
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Hook(HookError::Rejected { .. }) => StatusCode::FORBIDDEN,
            Self::Hook(HookError::Store(err)) => store_status(err),
            Self::Hook(HookError::SubjectMismatch { .. })
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match (err, err.kind()) {
        (StoreError::DeadlineExceeded, _) => StatusCode::GATEWAY_TIMEOUT,
        (_, ErrorKind::Validation) => StatusCode::BAD_REQUEST,
        (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
        (_, ErrorKind::AlreadyExists | ErrorKind::Conflict) => StatusCode::CONFLICT,
        (_, ErrorKind::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
        (_, ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        let body = Json(json!({ "error": { "message": self.to_string() } }));
        (status, body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
