//! `folio init` command implementation.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use folio_config::{CONFIG_FILENAME, Config};

use crate::error::CliError;
use crate::output;

/// Arguments for the init command.
#[derive(Args)]
pub(crate) struct InitArgs {
    /// Directory to create the blog in (default: current directory).
    dir: Option<PathBuf>,
}

impl InitArgs {
    /// Execute the init command.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let dir = self.dir.unwrap_or_else(|| PathBuf::from("."));

        let report = init_project(&dir)?;

        output::initialized(&dir, &report);
        Ok(())
    }
}

/// Files written and skipped by [`init_project`].
#[derive(Debug, Default)]
pub(crate) struct InitReport {
    pub(crate) written: Vec<PathBuf>,
    pub(crate) skipped: Vec<PathBuf>,
}

/// Write `folio.toml` and every embedded project file into `dir`.
///
/// Existing files are left untouched and reported as skipped.
pub(crate) fn init_project(dir: &Path) -> Result<InitReport, CliError> {
    let mut files: Vec<(PathBuf, Cow<'static, [u8]>)> = vec![(
        dir.join(CONFIG_FILENAME),
        Cow::Borrowed(Config::default_toml().as_bytes()),
    )];
    for (top, rest) in folio_assets::project_files() {
        let embedded = format!("{top}/{rest}");
        let Some(bytes) = folio_assets::get(&embedded) else {
            return Err(CliError::MissingAsset(embedded));
        };
        files.push((dir.join(top).join(rest), bytes));
    }

    let mut report = InitReport::default();
    for (path, bytes) in files {
        if path.exists() {
            report.skipped.push(path);
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &bytes)?;
        tracing::debug!(path = %path.display(), "Wrote project file");
        report.written.push(path);
    }

    fs::create_dir_all(dir.join("pages"))?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_init_writes_config_and_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let report = init_project(dir.path()).unwrap();

        assert!(report.skipped.is_empty());
        assert!(dir.path().join("folio.toml").is_file());
        assert!(dir.path().join("templates/application.tmpl").is_file());
        assert!(dir.path().join("templates/langselect.tmpl").is_file());
        assert!(dir.path().join("posts/sample.md").is_file());
        assert!(dir.path().join("assets/css/folio.css").is_file());
        assert!(dir.path().join("pages").is_dir());
        assert!(!dir.path().join("new").exists());
    }

    #[test]
    fn test_init_sample_post_is_visible() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path()).unwrap();

        let store = folio_posts::PostStore::new(dir.path().join("posts"), folio_posts::post_filter(None));
        store.load().unwrap();

        let visible = store.get_all_with_language("");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "sample");
    }

    #[test]
    fn test_init_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        init_project(dir.path()).unwrap();

        let config = Config::load(Some(dir.path().join("folio.toml").as_path()), None).unwrap();

        assert_eq!(config.content_resolved.post_dir, dir.path().join("posts"));
        assert_eq!(config.content_resolved.template_dir, dir.path().join("templates"));
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::write(dir.path().join("templates/post.tmpl"), "mine").unwrap();
        fs::write(dir.path().join("folio.toml"), "[server]\nport = 4000\n").unwrap();

        let report = init_project(dir.path()).unwrap();

        assert_eq!(
            report.skipped,
            vec![
                dir.path().join("folio.toml"),
                dir.path().join("templates/post.tmpl"),
            ]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("templates/post.tmpl")).unwrap(),
            "mine"
        );
        assert!(dir.path().join("templates/index.tmpl").is_file());
    }

    #[test]
    fn test_init_twice_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let first = init_project(dir.path()).unwrap();

        let second = init_project(dir.path()).unwrap();

        assert!(second.written.is_empty());
        assert_eq!(second.skipped.len(), first.written.len());
    }
}
