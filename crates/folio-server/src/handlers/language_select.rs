//! Language-select page.

use std::sync::Arc;

use axum::extract::State;
use axum::http::Uri;
use axum::response::Html;

use crate::error::ServerError;
use crate::handlers::PageContext;
use crate::language;
use crate::state::AppState;

/// Handle GET /changelang.
pub(crate) async fn change_language(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Html<String>, ServerError> {
    render(&state, uri.path())
}

/// Render the language-select page for a request to `path`.
///
/// Answers 404 when the site has no language-select bundle.
pub(crate) fn render(state: &AppState, path: &str) -> Result<Html<String>, ServerError> {
    let ctx = PageContext {
        languages: &state.languages.available,
        redirect: Some(language::redirect_target(path)),
        ..PageContext::default()
    };

    let html = state
        .templates
        .with_language_select(|bundle| bundle.render(&ctx))
        .ok_or_else(|| ServerError::NotFound(path.to_owned()))??;
    Ok(Html(html))
}
