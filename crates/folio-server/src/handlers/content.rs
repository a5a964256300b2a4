//! Index, post and page handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Html;
use folio_posts::PostStore;

use crate::error::ServerError;
use crate::handlers::{PageContext, as_refs};
use crate::language;
use crate::state::AppState;

/// Handle GET /.
pub(crate) async fn index(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Html<String>, ServerError> {
    let language = language::for_request(&state.languages, uri.query(), &headers);
    let posts = state.posts.get_all_with_language(&language);
    let pages = state.pages.get_all_with_language(&language);

    let ctx = PageContext {
        posts: Some(as_refs(&posts)),
        pages: as_refs(&pages),
        languages: &state.languages.available,
        language: &language,
        ..PageContext::default()
    };

    let html = state.templates.with_index(|bundle| bundle.render(&ctx))?;
    Ok(Html(html))
}

/// Handle GET /posts/{id}.
pub(crate) async fn post(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Html<String>, ServerError> {
    show(&state, &state.posts, &uri, &headers)
}

/// Handle GET /pages/{id}.
pub(crate) async fn page(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Html<String>, ServerError> {
    show(&state, &state.pages, &uri, &headers)
}

/// Render one visible entry of `store` with the post bundle.
fn show(
    state: &AppState,
    store: &PostStore,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<Html<String>, ServerError> {
    let id = raw_id(uri);
    let current = store
        .get_by_id(id)
        .ok_or_else(|| ServerError::NotFound(uri.path().to_owned()))?;

    let language = language::for_request(&state.languages, uri.query(), headers);
    let pages = state.pages.get_all_with_language(&language);

    let ctx = PageContext {
        pages: as_refs(&pages),
        languages: &state.languages.available,
        language: &language,
        current: Some(current.as_ref()),
        ..PageContext::default()
    };

    let html = state.templates.with_post(|bundle| bundle.render(&ctx))?;
    Ok(Html(html))
}

/// Last path segment, still percent-encoded like post ids are.
fn raw_id(uri: &Uri) -> &str {
    uri.path().rsplit('/').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_raw_id_keeps_encoding() {
        let uri: Uri = "/posts/caf%C3%A9?fr".parse().unwrap();

        assert_eq!(raw_id(&uri), "caf%C3%A9");
    }
}
