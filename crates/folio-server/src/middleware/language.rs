//! Language negotiation middleware.
//!
//! On a multilingual site, content routes answer with the language-select
//! page until the request names an available language.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::handlers;
use crate::language;
use crate::state::AppState;

/// Require a language choice before serving content.
pub(crate) async fn negotiate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.languages.multilingual {
        return next.run(request).await;
    }

    let query = request.uri().query();
    let requested = language::requested(query, request.headers());
    let cookie = language::cookie_to_set(query, request.headers());

    let mut response = if language::is_available(&requested, &state.languages.available) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), %requested, "No language chosen");
        handlers::language_select::render(&state, request.uri().path()).into_response()
    };

    if let Some(cookie) = cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}
