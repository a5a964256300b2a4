//! Error types for the HTTP server.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_templates::TemplateError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Host and port do not form a socket address.
    #[error("Invalid listen address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not be bound.
    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Serving connections failed.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    /// No visible post or page at the requested path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bundle failed to render.
    #[error(transparent)]
    Render(#[from] TemplateError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
            error => {
                tracing::error!(%error, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "500 internal server error").into_response()
            }
        }
    }
}
