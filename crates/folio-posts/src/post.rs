//! Post model and parser.
//!
//! A post file starts with a JSON object header immediately followed by the
//! Markdown body, with no separator:
//!
//! ```text
//! {"title": "A", "date": "2020-01-01T00:00:00Z", "language": "en"}
//! # Hi
//! ```
//!
//! The body is everything after the last byte the JSON decoder consumed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::markdown::render_markdown;

/// Characters escaped in post ids (everything but unreserved URL characters).
const ID_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Error parsing a post file.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    /// File could not be read.
    #[error("cannot read post {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The JSON header is malformed.
    #[error("invalid header in post {}: {source}", path.display())]
    Header {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The file has no header at all.
    #[error("post {} has no JSON header", path.display())]
    Empty { path: PathBuf },
}

/// JSON header of a post file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Header {
    title: String,
    author: String,
    #[serde(rename = "abstract")]
    summary: String,
    language: String,
    date: DateTime<Utc>,
    invisible: bool,
}

/// One parsed post.
///
/// Posts are immutable: a reload of the same file produces a new `Post` that
/// replaces the old one wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Post {
    /// Path of the source file. Identity key for watch events.
    #[serde(skip)]
    pub filename: PathBuf,
    /// URL-safe slug derived from the file name.
    pub id: String,
    pub title: String,
    pub author: String,
    /// Short description shown in listings.
    #[serde(rename = "abstract")]
    pub summary: String,
    pub language: String,
    /// Publication date, used for ordering.
    pub date: DateTime<Utc>,
    /// Hidden from listings and lookups while set.
    pub invisible: bool,
    /// Rendered HTML body.
    pub content: String,
}

impl Post {
    /// Read and parse a post file.
    ///
    /// # Errors
    ///
    /// Returns [`PostError`] if the file cannot be read or its header is
    /// missing or malformed.
    pub fn from_file(path: &Path) -> Result<Self, PostError> {
        let source = fs::read_to_string(path).map_err(|source| PostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &source)
    }

    /// Parse post source text read from `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::Header`] or [`PostError::Empty`] when the header
    /// cannot be decoded.
    pub fn parse(filename: impl Into<PathBuf>, source: &str) -> Result<Self, PostError> {
        let filename = filename.into();
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);

        let mut stream = serde_json::Deserializer::from_str(source).into_iter::<Header>();
        let header = match stream.next() {
            Some(Ok(header)) => header,
            Some(Err(source)) => {
                return Err(PostError::Header {
                    path: filename,
                    source,
                });
            }
            None => return Err(PostError::Empty { path: filename }),
        };
        let body = &source[stream.byte_offset()..];

        Ok(Self {
            id: post_id(&filename),
            filename,
            title: header.title,
            author: header.author,
            summary: header.summary,
            language: header.language,
            date: header.date,
            invisible: header.invisible,
            content: render_markdown(body),
        })
    }
}

/// Derive a post id from its file name.
///
/// The final extension is stripped and the rest percent-encoded, so the id is
/// stable across reloads and changes only when the file is renamed.
#[must_use]
pub fn post_id(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    utf8_percent_encode(&stem, ID_ESCAPE).to_string()
}
