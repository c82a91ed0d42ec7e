use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// The uniform error envelope: every handler failure surfaces as HTTP 500
/// with the full error chain as the body, and is logged under the `error`
/// category. Client-caused and internal failures share the same status,
/// matching the legacy WSAPI.
pub struct HandlerError(anyhow::Error);

impl HandlerError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl<E> From<E> for HandlerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        // anyhow's alternate format renders the chain as outer: middle: inner
        let message = format!("{:#}", self.0);
        tracing::error!(target: "error", "{message}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{message}\n")).into_response()
    }
}
