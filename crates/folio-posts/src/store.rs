//! Watch-synchronized post index.
//!
//! The index is guarded by one reader/writer lock. Request handlers take the
//! read side and get `Arc<Post>` snapshots back, so a post handed out stays
//! valid after the store has moved on. The only writer is the loader (at
//! startup) and the watch worker (afterwards), which applies one event at a
//! time.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use folio_watch::{EventSink, ExtensionFilter, WatchError, WatchEvent, WatchEventKind, WatchHandle};

use crate::post::Post;

/// File extensions always recognized as posts.
pub const POST_EXTENSIONS: [&str; 3] = ["md", "markdown", "mkd"];

/// Build the post extension filter, adding the project's own extension.
#[must_use]
pub fn post_filter(extra: Option<&str>) -> ExtensionFilter {
    let filter = ExtensionFilter::new(POST_EXTENSIONS);
    match extra {
        Some(ext) => filter.with(ext),
        None => filter,
    }
}

/// Post store error.
#[derive(Debug, thiserror::Error)]
pub enum PostStoreError {
    /// The post directory could not be listed.
    #[error("cannot read post directory {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The directory watch could not be started.
    #[error(transparent)]
    Watch(#[from] WatchError),
}

#[derive(Default)]
struct IndexState {
    /// Every loaded post, keyed by id. Includes invisible posts.
    by_key: HashMap<String, Arc<Post>>,
    /// Visible posts, newest first.
    sorted_visible: Vec<Arc<Post>>,
}

impl IndexState {
    fn resort(&mut self) {
        let mut visible: Vec<_> = self
            .by_key
            .values()
            .filter(|post| !post.invisible)
            .cloned()
            .collect();
        visible.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        self.sorted_visible = visible;
    }
}

/// Shared part of the store, also the watch sink.
struct PostIndex {
    dir: PathBuf,
    filter: ExtensionFilter,
    state: RwLock<IndexState>,
}

impl PostIndex {
    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, post: Post) -> Option<Arc<Post>> {
        let mut state = self.write();
        let previous = state.by_key.insert(post.id.clone(), Arc::new(post));
        state.resort();
        previous
    }

    fn delete_by_filename(&self, filename: &Path) -> Option<Arc<Post>> {
        let mut state = self.write();
        let id = state
            .by_key
            .iter()
            .find(|(_, post)| post.filename == filename)
            .map(|(id, _)| id.clone())?;
        let removed = state.by_key.remove(&id);
        state.resort();
        removed
    }

    fn reconcile(&self, event: &WatchEvent) {
        match event.kind {
            WatchEventKind::Created | WatchEventKind::Modified => self.reload(event),
            WatchEventKind::Renamed | WatchEventKind::Deleted => {
                match self.delete_by_filename(&event.path) {
                    Some(post) => {
                        tracing::info!(path = %event.path.display(), id = %post.id, kind = %event.kind, "Post removed");
                    }
                    None => {
                        tracing::warn!(path = %event.path.display(), kind = %event.kind, "Removed file is not a known post");
                    }
                }
            }
        }
    }

    fn reload(&self, event: &WatchEvent) {
        match Post::from_file(&event.path) {
            Ok(post) => {
                let id = post.id.clone();
                let invisible = post.invisible;
                let replaced = self.set(post).is_some();
                tracing::info!(
                    path = %event.path.display(),
                    %id,
                    invisible,
                    replaced,
                    kind = %event.kind,
                    "Post loaded"
                );
            }
            Err(error) => {
                // A post that no longer parses must not keep serving stale content.
                let removed = self.delete_by_filename(&event.path).is_some();
                tracing::warn!(
                    path = %event.path.display(),
                    %error,
                    removed,
                    kind = %event.kind,
                    "Post failed to load"
                );
            }
        }
    }
}

impl EventSink for PostIndex {
    fn on_event(&self, event: &WatchEvent) {
        self.reconcile(event);
    }

    fn on_error(&self, error: &WatchError) {
        tracing::error!(dir = %self.dir.display(), %error, "Post watch error");
    }
}

/// Live index of the posts in one directory.
///
/// Queries never see invisible posts; [`len`](Self::len) counts them.
///
/// # Example
///
/// ```ignore
/// let store = PostStore::open("posts", post_filter(None))?;
/// let newest = store.get_all().first().cloned();
/// ```
pub struct PostStore {
    index: Arc<PostIndex>,
    watch: Mutex<Option<WatchHandle>>,
}

impl PostStore {
    /// Create an empty store for `dir`. Nothing is read until
    /// [`load`](Self::load).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, filter: ExtensionFilter) -> Self {
        Self {
            index: Arc::new(PostIndex {
                dir: dir.into(),
                filter,
                state: RwLock::new(IndexState::default()),
            }),
            watch: Mutex::new(None),
        }
    }

    /// Create a store, load every post in `dir` and start watching it.
    ///
    /// `dir` is canonicalized first so paths reported by the OS match the
    /// paths recorded at load time.
    ///
    /// # Errors
    ///
    /// Returns [`PostStoreError::Scan`] if the directory cannot be read and
    /// [`PostStoreError::Watch`] if the watch cannot be started.
    pub fn open(dir: impl AsRef<Path>, filter: ExtensionFilter) -> Result<Self, PostStoreError> {
        let dir = dir.as_ref();
        let dir = fs::canonicalize(dir).map_err(|source| PostStoreError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        let store = Self::new(dir, filter);
        store.load()?;
        store.watch()?;
        Ok(store)
    }

    /// Directory this store indexes.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.index.dir
    }

    /// Load every post file in the directory.
    ///
    /// Files whose extension does not pass the filter are skipped. Files that
    /// fail to parse are logged and skipped. Returns the number of posts
    /// loaded.
    ///
    /// # Errors
    ///
    /// Returns [`PostStoreError::Scan`] if the directory cannot be listed.
    pub fn load(&self) -> Result<usize, PostStoreError> {
        let dir = &self.index.dir;
        let scan_error = |source| PostStoreError::Scan {
            path: dir.clone(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(scan_error)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(dir = %dir.display(), %error, "Failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.is_file() && self.index.filter.matches(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match Post::from_file(&path) {
                Ok(post) => {
                    tracing::debug!(path = %path.display(), id = %post.id, "Post loaded");
                    self.index.set(post);
                    loaded += 1;
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "Skipping post that failed to load");
                }
            }
        }

        tracing::info!(dir = %dir.display(), loaded, "Posts loaded");
        Ok(loaded)
    }

    /// Visible posts, newest first (ties broken by file name).
    #[must_use]
    pub fn get_all(&self) -> Vec<Arc<Post>> {
        self.index.read().sorted_visible.clone()
    }

    /// Visible posts in `language`, newest first. An empty `language`
    /// matches every post.
    #[must_use]
    pub fn get_all_with_language(&self, language: &str) -> Vec<Arc<Post>> {
        if language.is_empty() {
            return self.get_all();
        }
        self.index
            .read()
            .sorted_visible
            .iter()
            .filter(|post| post.language == language)
            .cloned()
            .collect()
    }

    /// Look up a visible post by id.
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Arc<Post>> {
        self.index
            .read()
            .by_key
            .get(id)
            .filter(|post| !post.invisible)
            .cloned()
    }

    /// Insert or replace a post. Returns the post previously stored under the
    /// same id.
    pub fn set(&self, post: Post) -> Option<Arc<Post>> {
        self.index.set(post)
    }

    /// Remove the post loaded from `filename`, if any.
    pub fn delete_by_filename(&self, filename: &Path) -> Option<Arc<Post>> {
        self.index.delete_by_filename(filename)
    }

    /// Number of posts held, invisible ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().by_key.len()
    }

    /// Whether the store holds no posts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply one change event to the index.
    ///
    /// Created and modified files are (re)parsed; a file that fails to parse
    /// drops any post previously loaded from it. Renamed and deleted files
    /// drop the post loaded from that path.
    pub fn reconcile(&self, event: &WatchEvent) {
        self.index.reconcile(event);
    }

    /// Start applying directory changes in the background.
    ///
    /// Does nothing if the store is already watching.
    ///
    /// # Errors
    ///
    /// Returns [`PostStoreError::Watch`] if the watch cannot be started.
    pub fn watch(&self) -> Result<(), PostStoreError> {
        let mut guard = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return Ok(());
        }
        let sink = Arc::clone(&self.index) as Arc<dyn EventSink>;
        let handle = folio_watch::watch(&self.index.dir, self.index.filter.clone(), sink)?;
        *guard = Some(handle);
        Ok(())
    }

    /// Whether the background watch is running.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(WatchHandle::is_running)
    }

    /// Stop the background watch. Safe to call more than once.
    ///
    /// The index stays readable after closing; it just stops changing.
    pub fn close(&self) {
        let handle = self
            .watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut handle) = handle {
            handle.stop();
            tracing::info!(dir = %self.index.dir.display(), "Post store closed");
        }
    }
}

impl std::fmt::Debug for PostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostStore")
            .field("dir", &self.index.dir)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
