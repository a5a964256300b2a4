//! Watch loop: one worker thread per watched directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::event::{ExtensionFilter, Normalized, WatchEvent, normalize};

/// Capacity of the queue between the `notify` callback and the worker.
const QUEUE_CAPACITY: usize = 256;

/// Watcher error.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The OS notification channel could not be established.
    #[error("cannot watch {}: {source}", path.display())]
    Init {
        /// Directory that was to be watched.
        path: PathBuf,
        /// Underlying notify error.
        #[source]
        source: notify::Error,
    },
    /// The worker thread could not be spawned.
    #[error("cannot start watch worker for {}: {source}", path.display())]
    Spawn {
        /// Directory that was to be watched.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Error reported by the OS while watching.
    #[error("watch notification error: {0}")]
    Notify(#[from] notify::Error),
}

/// Receiver of normalized events.
///
/// Implemented by the content stores. Calls are made from the watch worker
/// thread, strictly one at a time and in arrival order.
pub trait EventSink: Send + Sync + 'static {
    /// Apply one change event.
    fn on_event(&self, event: &WatchEvent);

    /// Report a non-fatal watch error.
    fn on_error(&self, error: &WatchError);
}

/// Message consumed by the worker thread.
enum Message {
    Event(notify::Event),
    Error(notify::Error),
    Shutdown,
}

/// Start watching `dir` (non-recursively).
///
/// Events whose path does not pass `filter` are dropped before they reach the
/// sink. The returned handle owns the worker thread and the OS watch.
///
/// # Errors
///
/// Returns [`WatchError::Init`] if the OS watch cannot be set up (missing
/// directory, exhausted watch limit) and [`WatchError::Spawn`] if the worker
/// thread cannot be created.
pub fn watch(
    dir: impl Into<PathBuf>,
    filter: ExtensionFilter,
    sink: Arc<dyn EventSink>,
) -> Result<WatchHandle, WatchError> {
    let dir = dir.into();
    let (tx, rx) = mpsc::sync_channel(QUEUE_CAPACITY);

    let notify_tx = tx.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let message = match res {
            Ok(event) => Message::Event(event),
            Err(error) => Message::Error(error),
        };
        // Fails only once the worker has exited.
        let _ = notify_tx.send(message);
    })
    .map_err(|source| WatchError::Init {
        path: dir.clone(),
        source,
    })?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|source| WatchError::Init {
            path: dir.clone(),
            source,
        })?;

    let worker = thread::Builder::new()
        .name("folio-watch".to_owned())
        .spawn(move || run(&rx, &filter, sink.as_ref()))
        .map_err(|source| WatchError::Spawn {
            path: dir.clone(),
            source,
        })?;

    tracing::debug!(dir = %dir.display(), "Watching directory");

    Ok(WatchHandle {
        running: Some(Running {
            dir,
            shutdown: tx,
            worker,
            watcher,
        }),
    })
}

/// Worker loop. Returns on shutdown or when every sender is gone.
fn run(rx: &Receiver<Message>, filter: &ExtensionFilter, sink: &dyn EventSink) {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Event(event) => dispatch(event, filter, sink),
            Message::Error(error) => sink.on_error(&WatchError::Notify(error)),
            Message::Shutdown => break,
        }
    }
}

fn dispatch(event: notify::Event, filter: &ExtensionFilter, sink: &dyn EventSink) {
    for normalized in normalize(event) {
        match normalized {
            Normalized::Event(event) if filter.matches(&event.path) => sink.on_event(&event),
            Normalized::Event(event) => {
                tracing::trace!(path = %event.path.display(), "Ignoring file with unwatched extension");
            }
            Normalized::Unrecognized { paths, kind } => {
                tracing::warn!(?paths, ?kind, "Unrecognized file event");
            }
        }
    }
}

struct Running {
    dir: PathBuf,
    shutdown: SyncSender<Message>,
    worker: JoinHandle<()>,
    watcher: RecommendedWatcher,
}

/// Handle to a running watch.
///
/// Dropping the handle stops the watch. [`stop`](Self::stop) may be called
/// any number of times; only the first call does anything.
///
/// Must not be stopped from inside an [`EventSink`] callback: stopping joins
/// the worker thread that runs the callback.
pub struct WatchHandle {
    running: Option<Running>,
}

impl WatchHandle {
    /// Stop watching.
    ///
    /// Signals the worker, waits for it to exit, then releases the OS watch.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        // Fails only if the worker is already gone.
        let _ = running.shutdown.send(Message::Shutdown);
        if running.worker.join().is_err() {
            tracing::error!(dir = %running.dir.display(), "Watch worker panicked");
        }
        drop(running.watcher);

        tracing::debug!(dir = %running.dir.display(), "Stopped watching directory");
    }

    /// Whether the watch is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Watched directory, while running.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.running.as_ref().map(|r| r.dir.as_path())
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("dir", &self.dir())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use notify::EventKind;
    use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::WatchEventKind;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<WatchEvent>>,
        errors: Mutex<usize>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<WatchEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn on_event(&self, event: &WatchEvent) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn on_error(&self, _error: &WatchError) {
            *self.errors.lock().unwrap() += 1;
        }
    }

    fn raw(kind: EventKind, path: &str) -> Message {
        Message::Event(notify::Event::new(kind).add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_watch_handle_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WatchHandle>();
    }

    #[test]
    fn test_run_dispatches_in_order_and_filters() {
        let (tx, rx) = mpsc::sync_channel(QUEUE_CAPACITY);
        let sink = RecordingSink::default();
        let filter = ExtensionFilter::new(["md"]);

        tx.send(raw(EventKind::Create(CreateKind::File), "/p/a.md"))
            .unwrap();
        tx.send(raw(EventKind::Create(CreateKind::File), "/p/a.txt"))
            .unwrap();
        tx.send(raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            "/p/b.md",
        ))
        .unwrap();
        tx.send(raw(EventKind::Remove(RemoveKind::File), "/p/c.md"))
            .unwrap();
        tx.send(Message::Error(notify::Error::generic("boom")))
            .unwrap();
        tx.send(Message::Shutdown).unwrap();
        // Never processed: the loop stops at shutdown.
        tx.send(raw(EventKind::Create(CreateKind::File), "/p/late.md"))
            .unwrap();

        run(&rx, &filter, &sink);

        assert_eq!(
            sink.events(),
            vec![
                WatchEvent::new("/p/a.md", WatchEventKind::Created),
                WatchEvent::new("/p/b.md", WatchEventKind::Renamed),
                WatchEvent::new("/p/c.md", WatchEventKind::Deleted),
            ]
        );
        assert_eq!(*sink.errors.lock().unwrap(), 1);
    }

    #[test]
    fn test_run_survives_unrecognized_notices() {
        let (tx, rx) = mpsc::sync_channel(QUEUE_CAPACITY);
        let sink = RecordingSink::default();

        tx.send(Message::Event(notify::Event::new(EventKind::Other)))
            .unwrap();
        tx.send(raw(EventKind::Other, "/p/rescan")).unwrap();
        tx.send(raw(EventKind::Create(CreateKind::File), "/p/a.md"))
            .unwrap();
        drop(tx);

        run(&rx, &ExtensionFilter::new(["md"]), &sink);

        assert_eq!(
            sink.events(),
            vec![WatchEvent::new("/p/a.md", WatchEventKind::Created)]
        );
        assert_eq!(*sink.errors.lock().unwrap(), 0);
    }

    #[test]
    fn test_run_exits_when_senders_dropped() {
        let (tx, rx) = mpsc::sync_channel::<Message>(QUEUE_CAPACITY);
        drop(tx);

        run(&rx, &ExtensionFilter::new(["md"]), &RecordingSink::default());
    }

    #[test]
    fn test_watch_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let result = watch(
            &missing,
            ExtensionFilter::new(["md"]),
            Arc::new(RecordingSink::default()),
        );

        assert!(matches!(result, Err(WatchError::Init { path, .. }) if path == missing));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut handle = watch(
            dir.path(),
            ExtensionFilter::new(["md"]),
            Arc::new(RecordingSink::default()),
        )
        .unwrap();

        assert!(handle.is_running());
        assert_eq!(handle.dir(), Some(dir.path()));

        handle.stop();
        handle.stop();

        assert!(!handle.is_running());
        assert!(handle.dir().is_none());
    }

    // Timing-sensitive: depends on the OS delivering notifications promptly.
    #[test]
    #[ignore = "depends on OS notification timing"]
    fn test_watch_delivers_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut handle = watch(
            dir.path(),
            ExtensionFilter::new(["md"]),
            Arc::clone(&sink) as Arc<dyn EventSink>,
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(100));
        let path = dir.path().join("new.md");
        std::fs::write(&path, "hello").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "hello").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline
            && !sink
                .events()
                .iter()
                .any(|e| e.path == path && e.kind == WatchEventKind::Created)
        {
            std::thread::sleep(Duration::from_millis(20));
        }
        handle.stop();

        let events = sink.events();
        assert!(events.iter().any(|e| e.path == path));
        assert!(events.iter().all(|e| e.path == path));
    }
}
