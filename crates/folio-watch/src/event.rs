//! Normalized watch events and extension filtering.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;

/// Kind of change observed on a watched file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchEventKind {
    /// File appeared (new file, or the new name of a rename).
    Created,
    /// File content or metadata changed.
    Modified,
    /// File moved away from this name.
    Renamed,
    /// File was removed.
    Deleted,
}

impl WatchEventKind {
    /// Lowercase name, as used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Renamed => "renamed",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized change event for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path of the file as reported by the OS (inside the watched directory).
    pub path: PathBuf,
    /// Kind of change.
    pub kind: WatchEventKind,
}

impl WatchEvent {
    /// Create a new event.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Set of file extensions a manager cares about.
///
/// Matching is case-insensitive and leading dots in the configured
/// extensions are ignored, so `".MD"` and `"md"` are equivalent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Create a filter from a list of extensions.
    ///
    /// Empty entries are dropped and duplicates are collapsed.
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        Self {
            extensions: normalized,
        }
    }

    /// Add one more extension to the filter.
    #[must_use]
    pub fn with(mut self, extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !self.extensions.contains(&ext) {
            self.extensions.push(ext);
            self.extensions.sort();
        }
        self
    }

    /// Check whether a path has one of the recognized extensions.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|known| *known == ext)
            })
    }

    /// Recognized extensions, lowercase and without dots.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

/// Result of normalizing a raw notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Normalized {
    /// One path's change.
    Event(WatchEvent),
    /// Notification whose kind maps to nothing in the vocabulary. Carries
    /// every path it named, possibly none (rescan and overflow notices).
    Unrecognized { paths: Vec<PathBuf>, kind: EventKind },
}

/// Translate one `notify` event into zero or more normalized events.
///
/// Access notifications are dropped: they never change file content.
pub(crate) fn normalize(event: notify::Event) -> Vec<Normalized> {
    let kind = event.kind;
    let mut paths = event.paths.into_iter();
    let each = |paths: std::vec::IntoIter<PathBuf>, kind: WatchEventKind| -> Vec<Normalized> {
        paths
            .map(|path| Normalized::Event(WatchEvent::new(path, kind)))
            .collect()
    };

    match kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            each(paths, WatchEventKind::Created)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            each(paths, WatchEventKind::Renamed)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                out.push(Normalized::Event(WatchEvent::new(
                    from,
                    WatchEventKind::Renamed,
                )));
            }
            out.extend(
                paths.map(|to| Normalized::Event(WatchEvent::new(to, WatchEventKind::Created))),
            );
            out
        }
        // Backend could not tell which half of the rename this is.
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .map(|path| {
                let kind = if path.exists() {
                    WatchEventKind::Created
                } else {
                    WatchEventKind::Renamed
                };
                Normalized::Event(WatchEvent::new(path, kind))
            })
            .collect(),
        EventKind::Modify(_) => each(paths, WatchEventKind::Modified),
        EventKind::Remove(_) => each(paths, WatchEventKind::Deleted),
        EventKind::Access(_) => Vec::new(),
        EventKind::Any | EventKind::Other => vec![Normalized::Unrecognized {
            paths: paths.collect(),
            kind,
        }],
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};
    use pretty_assertions::assert_eq;

    use super::*;

    fn raw(kind: EventKind, paths: &[&str]) -> notify::Event {
        paths
            .iter()
            .fold(notify::Event::new(kind), |event, path| {
                event.add_path(PathBuf::from(path))
            })
    }

    fn events(normalized: Vec<Normalized>) -> Vec<WatchEvent> {
        normalized
            .into_iter()
            .filter_map(|n| match n {
                Normalized::Event(event) => Some(event),
                Normalized::Unrecognized { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_filter_matches_case_insensitive() {
        let filter = ExtensionFilter::new(["md", ".Markdown"]);

        assert!(filter.matches(Path::new("posts/a.md")));
        assert!(filter.matches(Path::new("posts/a.MD")));
        assert!(filter.matches(Path::new("posts/a.markdown")));
        assert!(!filter.matches(Path::new("posts/a.txt")));
        assert!(!filter.matches(Path::new("posts/md")));
    }

    #[test]
    fn test_filter_with_adds_extension_once() {
        let filter = ExtensionFilter::new(["md"]).with(".post").with("MD");

        assert_eq!(filter.extensions(), &["md".to_owned(), "post".to_owned()]);
        assert!(filter.matches(Path::new("x.post")));
    }

    #[test]
    fn test_filter_drops_empty_extensions() {
        let filter = ExtensionFilter::new(["", ".", "tmpl"]);

        assert_eq!(filter.extensions(), &["tmpl".to_owned()]);
    }

    #[test]
    fn test_normalize_create() {
        let out = events(normalize(raw(
            EventKind::Create(CreateKind::File),
            &["/p/a.md"],
        )));

        assert_eq!(out, vec![WatchEvent::new("/p/a.md", WatchEventKind::Created)]);
    }

    #[test]
    fn test_normalize_modify_data_and_metadata() {
        let data = events(normalize(raw(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/p/a.md"],
        )));
        let meta = events(normalize(raw(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)),
            &["/p/a.md"],
        )));

        assert_eq!(data, vec![WatchEvent::new("/p/a.md", WatchEventKind::Modified)]);
        assert_eq!(meta, data);
    }

    #[test]
    fn test_normalize_rename_halves() {
        let from = events(normalize(raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/p/old.md"],
        )));
        let to = events(normalize(raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/p/new.md"],
        )));

        assert_eq!(from, vec![WatchEvent::new("/p/old.md", WatchEventKind::Renamed)]);
        assert_eq!(to, vec![WatchEvent::new("/p/new.md", WatchEventKind::Created)]);
    }

    #[test]
    fn test_normalize_rename_both() {
        let out = events(normalize(raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/old.md", "/p/new.md"],
        )));

        assert_eq!(
            out,
            vec![
                WatchEvent::new("/p/old.md", WatchEventKind::Renamed),
                WatchEvent::new("/p/new.md", WatchEventKind::Created),
            ]
        );
    }

    #[test]
    fn test_normalize_ambiguous_rename_uses_existence() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("here.md");
        std::fs::write(&present, "x").unwrap();
        let absent = dir.path().join("gone.md");

        let out = events(normalize(
            notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
                .add_path(present.clone())
                .add_path(absent.clone()),
        ));

        assert_eq!(
            out,
            vec![
                WatchEvent::new(present, WatchEventKind::Created),
                WatchEvent::new(absent, WatchEventKind::Renamed),
            ]
        );
    }

    #[test]
    fn test_normalize_remove() {
        let out = events(normalize(raw(
            EventKind::Remove(RemoveKind::File),
            &["/p/a.md"],
        )));

        assert_eq!(out, vec![WatchEvent::new("/p/a.md", WatchEventKind::Deleted)]);
    }

    #[test]
    fn test_normalize_access_is_dropped() {
        let out = normalize(raw(EventKind::Access(AccessKind::Read), &["/p/a.md"]));

        assert!(out.is_empty());
    }

    #[test]
    fn test_normalize_other_is_unrecognized() {
        let out = normalize(raw(EventKind::Other, &["/p/a.md", "/p/b"]));

        assert_eq!(
            out,
            vec![Normalized::Unrecognized {
                paths: vec![PathBuf::from("/p/a.md"), PathBuf::from("/p/b")],
                kind: EventKind::Other,
            }]
        );
    }

    #[test]
    fn test_normalize_pathless_notice_is_unrecognized() {
        let out = normalize(raw(EventKind::Other, &[]));

        assert_eq!(
            out,
            vec![Normalized::Unrecognized {
                paths: Vec::new(),
                kind: EventKind::Other,
            }]
        );
    }
}
