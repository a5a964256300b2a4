//! Directory watcher for Folio content stores.
//!
//! This crate wraps OS-level filesystem notifications (via `notify`) for a
//! single directory and turns them into a small, normalized event vocabulary:
//!
//! - [`WatchEventKind::Created`]
//! - [`WatchEventKind::Modified`]
//! - [`WatchEventKind::Renamed`] (the old name; the new name arrives as `Created`)
//! - [`WatchEventKind::Deleted`]
//!
//! # Architecture
//!
//! ```text
//! notify callback ──► bounded queue ──► worker thread ──► EventSink
//!                     (events, errors,   (one message
//!                      shutdown)          at a time)
//! ```
//!
//! Each call to [`watch`] spawns exactly one worker thread. The worker applies
//! one message at a time, so a sink never sees two events concurrently.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use folio_watch::{ExtensionFilter, watch};
//!
//! let filter = ExtensionFilter::new(["md", "markdown"]);
//! let mut handle = watch("posts", filter, Arc::new(MySink))?;
//! // ...
//! handle.stop();
//! ```

mod event;
mod watcher;

pub use event::{ExtensionFilter, WatchEvent, WatchEventKind};
pub use watcher::{EventSink, WatchError, WatchHandle, watch};
