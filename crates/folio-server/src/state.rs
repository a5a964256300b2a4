//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use folio_posts::PostStore;
use folio_templates::TemplateRegistry;

use crate::Languages;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Live template bundles.
    pub(crate) templates: Arc<TemplateRegistry>,
    /// Blog posts.
    pub(crate) posts: Arc<PostStore>,
    /// Standalone pages.
    pub(crate) pages: Arc<PostStore>,
    pub(crate) languages: Languages,
}
