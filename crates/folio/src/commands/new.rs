//! `folio new` command implementation.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use folio_config::Config;

use crate::error::CliError;
use crate::output;

/// Arguments for the new command.
#[derive(Args)]
pub(crate) struct NewArgs {
    /// Create a page instead of a post.
    #[arg(long)]
    page: bool,

    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Name of the new file; words are joined with underscores.
    #[arg(required = true)]
    words: Vec<String>,
}

impl NewArgs {
    /// Execute the new command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the name is invalid or the
    /// file already exists.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let config = Config::load(self.config.as_deref(), None)?;
        let content = &config.content_resolved;
        let dir = if self.page {
            &content.page_dir
        } else {
            &content.post_dir
        };

        let path = create_blank(dir, &self.words, &content.post_extension)?;

        output::created(&path);
        Ok(())
    }
}

/// Write the blank post skeleton to `<dir>/<words joined with _>.<extension>`.
pub(crate) fn create_blank(
    dir: &Path,
    words: &[String],
    extension: &str,
) -> Result<PathBuf, CliError> {
    let name = words.join("_");
    if name.trim().is_empty() {
        return Err(CliError::Validation("no file name given".to_owned()));
    }
    if name.contains(['/', '\\']) {
        return Err(CliError::Validation(format!(
            "file name {name:?} must not contain path separators"
        )));
    }

    let Some(blank) = folio_assets::get(folio_assets::BLANK_POST) else {
        return Err(CliError::MissingAsset(folio_assets::BLANK_POST.to_owned()));
    };

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}.{extension}"));
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
            return Err(CliError::Exists(path));
        }
        Err(error) => return Err(error.into()),
    };
    file.write_all(&blank)?;

    Ok(path)
}
