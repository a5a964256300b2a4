//! CLI error types.

use std::path::PathBuf;

use folio_config::ConfigError;
use folio_posts::PostStoreError;
use folio_server::ServerError;
use folio_templates::TemplateInitError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Templates(#[from] TemplateInitError),

    #[error("{0}")]
    Posts(#[from] PostStoreError),

    #[error("{0}")]
    Server(#[from] ServerError),

    #[error("{} already exists, will not overwrite", .0.display())]
    Exists(PathBuf),

    #[error("embedded file {0} is missing from this build")]
    MissingAsset(String),

    #[error("{0}")]
    Validation(String),
}
