//! Live template registry.
//!
//! The registry holds the current [`Bundles`] as an `RwLock<Arc<Bundles>>`.
//! Readers clone the `Arc` and render without holding the lock; the watch
//! worker compiles a complete new set off to the side and swaps it in whole,
//! so a render never sees a mix of old and new fragments.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use folio_watch::{EventSink, ExtensionFilter, WatchError, WatchEvent, WatchHandle};

use crate::bundle::{Bundle, Bundles, TemplateError, compile_bundles};
use crate::fragment::Fragment;
use crate::recovery::{Recovery, RecoveryError, RecoveryPolicy, RecoverySource};

/// Extension of template fragment files.
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// Template registry construction options.
#[derive(Clone, Debug)]
pub struct RegistryOptions {
    /// Directory holding the fragment files.
    pub dir: PathBuf,
    /// Whether the language-select bundle is required.
    pub with_language_select: bool,
    /// Which failures may be repaired by rewriting files.
    pub policy: RecoveryPolicy,
}

impl RegistryOptions {
    /// Options for `dir` with the default policy and no language selection.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            with_language_select: false,
            policy: RecoveryPolicy::default(),
        }
    }

    fn recovery<'a>(&'a self, source: &'a dyn RecoverySource) -> Recovery<'a> {
        Recovery {
            dir: &self.dir,
            with_language_select: self.with_language_select,
            policy: self.policy,
            source,
        }
    }
}

/// Template registry startup error.
#[derive(Debug, thiserror::Error)]
pub enum TemplateInitError {
    /// The templates do not compile and could not be repaired.
    #[error("templates in {} cannot be used: {source}", dir.display())]
    Compile {
        dir: PathBuf,
        /// First failure found.
        #[source]
        source: TemplateError,
    },
    /// The directory watch could not be started.
    #[error(transparent)]
    Watch(#[from] WatchError),
}

struct RegistryInner {
    options: RegistryOptions,
    source: Box<dyn RecoverySource>,
    bundles: RwLock<Arc<Bundles>>,
}

impl RegistryInner {
    fn snapshot(&self) -> Arc<Bundles> {
        Arc::clone(&self.bundles.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn swap(&self, bundles: Bundles) {
        *self.bundles.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(bundles);
    }

    fn reconcile(&self, event: &WatchEvent) {
        let Some(fragment) = Fragment::from_path(&event.path) else {
            tracing::debug!(path = %event.path.display(), "Ignoring file that is not a template fragment");
            return;
        };
        if fragment == Fragment::LanguageSelect && !self.options.with_language_select {
            tracing::debug!(%fragment, "Ignoring language-select template while disabled");
            return;
        }

        // Deleted and renamed fragments are recompiled too: an editor that
        // saves by rename may already have put the file back.
        match compile_bundles(&self.options.dir, self.options.with_language_select) {
            Ok(bundles) => {
                self.swap(bundles);
                tracing::info!(%fragment, kind = %event.kind, "Templates recompiled");
            }
            Err(error) => {
                tracing::warn!(%fragment, kind = %event.kind, %error, "Templates no longer compile");
                match self.options.recovery(self.source.as_ref()).heal(&error) {
                    Ok(healed) => {
                        self.swap(healed.bundles);
                        tracing::info!(restored = ?healed.restored, "Templates healed");
                    }
                    Err(RecoveryError::Refused(failure)) => {
                        tracing::warn!(%failure, "Template repair disabled; keeping last good templates");
                    }
                    Err(error) => {
                        tracing::error!(%error, "Template recovery failed; keeping last good templates");
                    }
                }
            }
        }
    }
}

impl EventSink for RegistryInner {
    fn on_event(&self, event: &WatchEvent) {
        self.reconcile(event);
    }

    fn on_error(&self, error: &WatchError) {
        tracing::error!(dir = %self.options.dir.display(), %error, "Template watch error");
    }
}

/// Compiled templates for every page kind, kept in sync with the template
/// directory and repaired from canonical copies when fragments break.
///
/// # Example
///
/// ```ignore
/// let registry = TemplateRegistry::start(RegistryOptions::new("templates"), EmbeddedSource)?;
/// let html = registry.with_index(|bundle| bundle.render(&ctx))?;
/// ```
pub struct TemplateRegistry {
    inner: Arc<RegistryInner>,
    watch: Mutex<Option<WatchHandle>>,
}

impl TemplateRegistry {
    /// Compile the templates, repairing them if policy allows, without
    /// watching the directory.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateInitError::Compile`] with the first failure if the
    /// templates do not compile and recovery does not fix them.
    pub fn new(
        options: RegistryOptions,
        source: impl RecoverySource + 'static,
    ) -> Result<Self, TemplateInitError> {
        let bundles = match compile_bundles(&options.dir, options.with_language_select) {
            Ok(bundles) => bundles,
            Err(error) => {
                tracing::warn!(dir = %options.dir.display(), %error, "Templates do not compile; attempting recovery");
                let healed = options.recovery(&source).heal(&error);
                match healed {
                    Ok(healed) => {
                        tracing::info!(restored = ?healed.restored, "Templates healed");
                        healed.bundles
                    }
                    Err(recovery_error) => {
                        tracing::error!(error = %recovery_error, "Template recovery failed");
                        return Err(TemplateInitError::Compile {
                            dir: options.dir,
                            source: error,
                        });
                    }
                }
            }
        };

        tracing::info!(dir = %options.dir.display(), "Templates loaded");

        Ok(Self {
            inner: Arc::new(RegistryInner {
                options,
                source: Box::new(source),
                bundles: RwLock::new(Arc::new(bundles)),
            }),
            watch: Mutex::new(None),
        })
    }

    /// Compile the templates and start watching the template directory.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateInitError`] if the templates cannot be compiled or
    /// the watch cannot be started.
    pub fn start(
        options: RegistryOptions,
        source: impl RecoverySource + 'static,
    ) -> Result<Self, TemplateInitError> {
        let registry = Self::new(options, source)?;
        registry.watch()?;
        Ok(registry)
    }

    /// Template directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.inner.options.dir
    }

    /// Current bundle set.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Bundles> {
        self.inner.snapshot()
    }

    /// Run `f` with the current index bundle.
    pub fn with_index<R>(&self, f: impl FnOnce(&Bundle) -> R) -> R {
        f(self.inner.snapshot().index())
    }

    /// Run `f` with the current post bundle.
    pub fn with_post<R>(&self, f: impl FnOnce(&Bundle) -> R) -> R {
        f(self.inner.snapshot().post())
    }

    /// Run `f` with the current language-select bundle.
    ///
    /// Returns `None` without calling `f` when language selection is
    /// disabled.
    pub fn with_language_select<R>(&self, f: impl FnOnce(&Bundle) -> R) -> Option<R> {
        self.inner.snapshot().language_select().map(f)
    }

    /// Apply one change event.
    ///
    /// Events for files outside the fragment set are ignored. Any event for
    /// a known fragment recompiles the full set; if that fails the recovery
    /// protocol runs, and the previous set stays live unless it succeeds.
    pub fn reconcile(&self, event: &WatchEvent) {
        self.inner.reconcile(event);
    }

    /// Start applying directory changes in the background.
    ///
    /// Does nothing if the registry is already watching.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] if the watch cannot be started.
    pub fn watch(&self) -> Result<(), WatchError> {
        let mut guard = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return Ok(());
        }
        let sink = Arc::clone(&self.inner) as Arc<dyn EventSink>;
        let filter = ExtensionFilter::new([TEMPLATE_EXTENSION]);
        *guard = Some(folio_watch::watch(&self.inner.options.dir, filter, sink)?);
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
    pub fn close(&self) {
        let handle = self
            .watch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut handle) = handle {
            handle.stop();
            tracing::info!(dir = %self.dir().display(), "Template registry closed");
        }
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}
