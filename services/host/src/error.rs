use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Error type shared by the host handlers. Implementing `IntoResponse` lets
/// handlers propagate failures with `?` while the browser still receives a
/// well-formed response.
#[derive(Debug, Error)]
pub enum AppError {
    /// Rendering or encoding failures. The detail is logged, never rendered.
    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("unknown remote '{0}'")]
    UnknownRemote(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Internal(err) => {
                error!(error = %err, "serving 500 due to internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AppError::UnknownRemote(id) => {
                (StatusCode::NOT_FOUND, format!("unknown remote '{id}'")).into_response()
            }
        }
    }
}
