//! Post storage for Folio.
//!
//! This crate keeps an in-memory, query-ready index of the post files in one
//! directory and keeps it synchronized with the disk while request handlers
//! read from it concurrently.
//!
//! # Architecture
//!
//! - [`Post`]: one parsed document (JSON header + Markdown body)
//! - [`render_markdown`]: the Markdown-to-HTML transform applied at load time
//! - [`PostStore`]: the index, its bulk loader, and the watch-driven
//!   reconciliation of create/modify/rename/delete events
//!
//! # Example
//!
//! ```ignore
//! use folio_posts::{PostStore, post_filter};
//!
//! let store = PostStore::open("posts", post_filter(Some("post")))?;
//! for post in store.get_all_with_language("en") {
//!     println!("{}: {}", post.id, post.title);
//! }
//! store.close();
//! ```

mod markdown;
mod post;
mod store;

pub use markdown::render_markdown;
pub use post::{Post, PostError, post_id};
pub use store::{POST_EXTENSIONS, PostStore, PostStoreError, post_filter};
