//! Template registry for Folio.
//!
//! Templates are a small, closed set of fragment files (see [`Fragment`]).
//! The registry composes them into one [`Bundle`] per page kind, keeps the
//! bundles in sync with the template directory, and repairs broken or
//! deleted fragments from a [`RecoverySource`] so that rendering keeps
//! working whatever happens on disk.
//!
//! # Recovery
//!
//! ```text
//! event ──► recompile ──ok──► swap bundles
//!               │
//!             error ──► policy allows? ──no──► keep last good bundles
//!                            │
//!                           yes ──► restore canonical file ──► recompile
//! ```
//!
//! Each fragment is restored at most once per event. A fragment that still
//! fails after its restore ends recovery; the last good bundles stay live.

mod bundle;
mod fragment;
mod recovery;
mod registry;

pub use bundle::{Bundle, Bundles, TemplateError, compile_bundles};
pub use fragment::{BundleKind, Fragment};
pub use recovery::{EmbeddedSource, Failure, RecoveryError, RecoveryPolicy, RecoverySource};
pub use registry::{RegistryOptions, TEMPLATE_EXTENSION, TemplateInitError, TemplateRegistry};
