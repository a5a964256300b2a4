//! Self-healing for required template fragments.
//!
//! When the fragment set stops compiling, the registry asks a
//! [`RecoverySource`] for the canonical bytes of the failing fragment, writes
//! them back to disk and compiles again. Whether a rewrite is allowed at all
//! is governed by [`RecoveryPolicy`].

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};


use crate::bundle::{Bundles, TemplateError, compile_bundles};
use crate::fragment::Fragment;

/// Canonical content for template fragments.
pub trait RecoverySource: Send + Sync {
    /// Canonical bytes of `fragment`, if this source has them.
    fn canonical(&self, fragment: Fragment) -> Option<Cow<'static, [u8]>>;
}

/// The default fragments compiled into the binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedSource;

impl RecoverySource for EmbeddedSource {
    fn canonical(&self, fragment: Fragment) -> Option<Cow<'static, [u8]>> {
        folio_assets::template(fragment.file_name())
    }
}

/// Which failures may be repaired by rewriting files on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Overwrite fragments that exist but do not compile.
    pub rewrite_on_invalid: bool,
    /// Recreate fragments that no longer exist.
    pub rewrite_on_missing: bool,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            rewrite_on_invalid: false,
            rewrite_on_missing: true,
        }
    }
}

impl RecoveryPolicy {
    /// Whether `failure` may be repaired.
    #[must_use]
    pub fn allows(self, failure: Failure) -> bool {
        match failure {
            Failure::Invalid(_) => self.rewrite_on_invalid,
            Failure::Missing(_) => self.rewrite_on_missing,
        }
    }
}

/// Why a fragment keeps the templates from compiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// The file exists but cannot be read or compiled.
    Invalid(Fragment),
    /// The file does not exist.
    Missing(Fragment),
}

impl Failure {
    #[must_use]
    pub fn fragment(self) -> Fragment {
        match self {
            Self::Invalid(fragment) | Self::Missing(fragment) => fragment,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(fragment) => write!(f, "{fragment} is invalid"),
            Self::Missing(fragment) => write!(f, "{fragment} is missing"),
        }
    }
}

/// Recovery error.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// Policy forbids repairing this failure.
    #[error("{0} and rewriting it is disabled")]
    Refused(Failure),
    /// The recovery source has no content for the fragment.
    #[error("no canonical content for {0}")]
    NoCanonical(Fragment),
    /// Writing the canonical content failed.
    #[error("cannot restore {fragment} at {}: {source}", path.display())]
    Write {
        fragment: Fragment,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A fragment still fails after its canonical content was restored.
    #[error("{fragment} still fails after restore: {source}")]
    Recompile {
        fragment: Fragment,
        #[source]
        source: TemplateError,
    },
    /// The error does not originate from a fragment file.
    #[error("error cannot be repaired by restoring a fragment")]
    Unsupported,
}

/// Result of a successful recovery.
#[derive(Debug)]
pub(crate) struct Healed {
    pub(crate) bundles: Bundles,
    /// Fragments rewritten, in order.
    pub(crate) restored: Vec<Fragment>,
}

/// Detect, decide, restore and recompile for one template directory.
pub(crate) struct Recovery<'a> {
    pub(crate) dir: &'a Path,
    pub(crate) with_language_select: bool,
    pub(crate) policy: RecoveryPolicy,
    pub(crate) source: &'a dyn RecoverySource,
}

impl Recovery<'_> {
    /// Repair the fragment set until it compiles.
    ///
    /// Each failing fragment is restored at most once. If a restored fragment
    /// fails again, or policy refuses a repair, recovery stops; files already
    /// restored stay on disk.
    pub(crate) fn heal(&self, error: &TemplateError) -> Result<Healed, RecoveryError> {
        let mut failure = error.failure().ok_or(RecoveryError::Unsupported)?;
        let mut restored = Vec::new();

        loop {
            if !self.policy.allows(failure) {
                return Err(RecoveryError::Refused(failure));
            }
            let fragment = failure.fragment();
            self.restore(fragment)?;
            restored.push(fragment);

            match compile_bundles(self.dir, self.with_language_select) {
                Ok(bundles) => return Ok(Healed { bundles, restored }),
                Err(error) => {
                    let next = error.failure().ok_or(RecoveryError::Unsupported)?;
                    if restored.contains(&next.fragment()) {
                        return Err(RecoveryError::Recompile {
                            fragment: next.fragment(),
                            source: error,
                        });
                    }
                    tracing::debug!(%next, "Another template fragment needs recovery");
                    failure = next;
                }
            }
        }
    }

    fn restore(&self, fragment: Fragment) -> Result<(), RecoveryError> {
        let bytes = self
            .source
            .canonical(fragment)
            .ok_or(RecoveryError::NoCanonical(fragment))?;
        let path = self.dir.join(fragment.file_name());
        let write_error = |source| RecoveryError::Write {
            fragment,
            path: path.clone(),
            source,
        };

        fs::create_dir_all(self.dir).map_err(write_error)?;
        fs::write(&path, &bytes).map_err(write_error)?;

        tracing::info!(%fragment, path = %path.display(), "Restored template from canonical copy");
        Ok(())
    }
}
