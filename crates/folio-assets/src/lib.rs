//! Embedded default files for Folio.
//!
//! Everything under `defaults/` is compiled into the binary via `rust-embed`:
//!
//! - `templates/` - the template fragments the registry requires
//! - `posts/`, `pages/` - sample content written by `folio init`
//! - `assets/` - the default stylesheet
//! - `new/blank.md` - skeleton used by `folio new`
//!
//! Paths are relative to `defaults/` and always use forward slashes.

use std::borrow::Cow;

#[derive(rust_embed::RustEmbed)]
#[folder = "defaults/"]
struct Defaults;

/// Embedded path of the blank post skeleton.
pub const BLANK_POST: &str = "new/blank.md";

/// Top-level directories of the embedded tree that `folio init` copies into a
/// new project.
pub const PROJECT_DIRS: [&str; 4] = ["templates", "posts", "pages", "assets"];

/// Get an embedded file by path (relative to `defaults/`).
///
/// Returns the file contents if the file exists, `None` otherwise.
pub fn get(path: &str) -> Option<Cow<'static, [u8]>> {
    Defaults::get(path).map(|f| f.data)
}

/// Get an embedded template fragment by file name (e.g. `"post.tmpl"`).
pub fn template(file_name: &str) -> Option<Cow<'static, [u8]>> {
    get(&format!("templates/{file_name}"))
}

/// Iterate all embedded paths.
pub fn iter() -> impl Iterator<Item = Cow<'static, str>> {
    Defaults::iter()
}

/// Iterate embedded paths that belong in a new project, split into their
/// top-level directory and the remainder (e.g. `("assets", "css/folio.css")`).
pub fn project_files() -> impl Iterator<Item = (&'static str, String)> {
    iter().filter_map(|path| {
        let (top, rest) = path.split_once('/')?;
        let top = PROJECT_DIRS.into_iter().find(|dir| *dir == top)?;
        Some((top, rest.to_owned()))
    })
}
