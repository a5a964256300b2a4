//! HTTP request handlers.

pub(crate) mod content;
pub(crate) mod health;
pub(crate) mod language_select;

use std::sync::Arc;

use folio_posts::Post;
use serde::Serialize;

/// Data handed to the templates.
///
/// `posts` is only present on the index, `current` only on a post or page
/// and `redirect` only on the language-select page.
#[derive(Debug, Default, Serialize)]
pub(crate) struct PageContext<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) posts: Option<Vec<&'a Post>>,
    pub(crate) pages: Vec<&'a Post>,
    pub(crate) languages: &'a [String],
    pub(crate) language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) current: Option<&'a Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) redirect: Option<&'a str>,
}

pub(crate) fn as_refs(posts: &[Arc<Post>]) -> Vec<&Post> {
    posts.iter().map(AsRef::as_ref).collect()
}
