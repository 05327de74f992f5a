use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::handlers::Reply;

/// Errors produced by path resolution and the method handlers.
///
/// `Forbidden` is the only variant that carries an explicit HTTP status of its
/// own; every other failure is normalized to a 500 whose body is the error
/// text.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The requested path normalizes to somewhere outside the served root.
    #[error("path escapes the served root")]
    Forbidden,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::Forbidden => StatusCode::FORBIDDEN,
            ServeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        Reply::text(self.status(), self.to_string()).into_response()
    }
}
