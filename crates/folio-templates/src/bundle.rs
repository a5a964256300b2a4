//! Compiling fragment files into renderable bundles.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::fragment::{BundleKind, Fragment};
use crate::recovery::Failure;

/// Template error.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A fragment file could not be read.
    #[error("cannot read template {fragment} at {}: {source}", path.display())]
    Read {
        fragment: Fragment,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A fragment file failed to compile.
    #[error("template {fragment} does not compile: {source}")]
    Compile {
        fragment: Fragment,
        #[source]
        source: minijinja::Error,
    },
    /// Rendering a compiled bundle failed.
    #[error("cannot render {kind} page: {source}")]
    Render {
        kind: BundleKind,
        #[source]
        source: minijinja::Error,
    },
}

impl TemplateError {
    /// Classify a compile-time error for the recovery protocol.
    ///
    /// Returns `None` for render errors, which no file rewrite can fix.
    #[must_use]
    pub fn failure(&self) -> Option<Failure> {
        match self {
            Self::Read {
                fragment, source, ..
            } if source.kind() == io::ErrorKind::NotFound => Some(Failure::Missing(*fragment)),
            Self::Read { fragment, .. } | Self::Compile { fragment, .. } => {
                Some(Failure::Invalid(*fragment))
            }
            Self::Render { .. } => None,
        }
    }
}

/// One compiled page kind: the shell, the shared fragments and one content
/// fragment.
#[derive(Debug)]
pub struct Bundle {
    kind: BundleKind,
    env: Environment<'static>,
}

impl Bundle {
    fn compile(kind: BundleKind, sources: &HashMap<Fragment, String>) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        for fragment in kind.fragments() {
            let source = sources.get(&fragment).cloned().unwrap_or_default();
            env.add_template_owned(fragment.template_name(), source)
                .map_err(|source| TemplateError::Compile { fragment, source })?;
        }

        Ok(Self { kind, env })
    }

    /// Page kind of this bundle.
    #[must_use]
    pub fn kind(&self) -> BundleKind {
        self.kind
    }

    /// Render the page shell with `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] if evaluation fails.
    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String, TemplateError> {
        let render_error = |source| TemplateError::Render {
            kind: self.kind,
            source,
        };
        self.env
            .get_template(Fragment::Application.template_name())
            .map_err(render_error)?
            .render(ctx)
            .map_err(render_error)
    }
}

/// The complete set of compiled bundles, swapped as one unit.
#[derive(Debug)]
pub struct Bundles {
    index: Bundle,
    post: Bundle,
    language_select: Option<Bundle>,
}

impl Bundles {
    /// Bundle for `kind`, or `None` for a disabled language-select bundle.
    #[must_use]
    pub fn get(&self, kind: BundleKind) -> Option<&Bundle> {
        match kind {
            BundleKind::Index => Some(&self.index),
            BundleKind::Post => Some(&self.post),
            BundleKind::LanguageSelect => self.language_select.as_ref(),
        }
    }

    #[must_use]
    pub fn index(&self) -> &Bundle {
        &self.index
    }

    #[must_use]
    pub fn post(&self) -> &Bundle {
        &self.post
    }

    #[must_use]
    pub fn language_select(&self) -> Option<&Bundle> {
        self.language_select.as_ref()
    }
}

/// Read and compile every required fragment in `dir`.
///
/// Fails on the first fragment that cannot be read or compiled; the error
/// names that fragment.
///
/// # Errors
///
/// Returns [`TemplateError::Read`] or [`TemplateError::Compile`].
pub fn compile_bundles(dir: &Path, with_language_select: bool) -> Result<Bundles, TemplateError> {
    let kinds: &[BundleKind] = if with_language_select {
        &[BundleKind::Index, BundleKind::Post, BundleKind::LanguageSelect]
    } else {
        &[BundleKind::Index, BundleKind::Post]
    };

    let mut sources = HashMap::new();
    for fragment in Fragment::ALL {
        if !kinds.iter().any(|kind| kind.fragments().any(|f| f == fragment)) {
            continue;
        }
        let path = dir.join(fragment.file_name());
        let source = fs::read_to_string(&path).map_err(|source| TemplateError::Read {
            fragment,
            path,
            source,
        })?;
        sources.insert(fragment, source);
    }

    let index = Bundle::compile(BundleKind::Index, &sources)?;
    let post = Bundle::compile(BundleKind::Post, &sources)?;
    let language_select = if with_language_select {
        Some(Bundle::compile(BundleKind::LanguageSelect, &sources)?)
    } else {
        None
    };

    tracing::debug!(dir = %dir.display(), with_language_select, "Templates compiled");

    Ok(Bundles {
        index,
        post,
        language_select,
    })
}
