//! The closed set of template fragments and the bundles built from them.

use std::fmt;
use std::path::Path;

/// A required template fragment file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Page shell; includes every other fragment.
    Application,
    Style,
    Javascript,
    Header,
    Footer,
    /// Content of the post listing page.
    Index,
    /// Content of a single post or page.
    Post,
    /// Content of the language chooser.
    LanguageSelect,
}

impl Fragment {
    /// Every fragment, shared ones first.
    pub const ALL: [Self; 8] = [
        Self::Application,
        Self::Style,
        Self::Javascript,
        Self::Header,
        Self::Footer,
        Self::Index,
        Self::Post,
        Self::LanguageSelect,
    ];

    /// Fragments that are part of every bundle.
    pub const SHARED: [Self; 5] = [
        Self::Application,
        Self::Style,
        Self::Javascript,
        Self::Header,
        Self::Footer,
    ];

    /// File name inside the template directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Application => "application.tmpl",
            Self::Style => "style.tmpl",
            Self::Javascript => "javascript.tmpl",
            Self::Header => "header.tmpl",
            Self::Footer => "footer.tmpl",
            Self::Index => "index.tmpl",
            Self::Post => "post.tmpl",
            Self::LanguageSelect => "langselect.tmpl",
        }
    }

    /// Name the fragment is registered under inside a bundle.
    ///
    /// Content fragments all register as `content` so the shell can include
    /// whichever one its bundle carries.
    #[must_use]
    pub fn template_name(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Style => "style",
            Self::Javascript => "javascript",
            Self::Header => "header",
            Self::Footer => "footer",
            Self::Index | Self::Post | Self::LanguageSelect => "content",
        }
    }

    /// Look up a fragment by its file name.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.file_name() == name)
    }

    /// Look up the fragment a path refers to, by its last component.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_file_name)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A page kind with its own compiled bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BundleKind {
    Index,
    Post,
    LanguageSelect,
}

impl BundleKind {
    /// The content fragment this bundle adds to the shared set.
    #[must_use]
    pub fn content(self) -> Fragment {
        match self {
            Self::Index => Fragment::Index,
            Self::Post => Fragment::Post,
            Self::LanguageSelect => Fragment::LanguageSelect,
        }
    }

    /// Every fragment the bundle is composed of.
    pub fn fragments(self) -> impl Iterator<Item = Fragment> {
        Fragment::SHARED.into_iter().chain([self.content()])
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Index => "index",
            Self::Post => "post",
            Self::LanguageSelect => "language-select",
        })
    }
}
