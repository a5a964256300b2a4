//! `folio serve` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use folio_config::{CliSettings, Config};
use folio_posts::{PostStore, post_filter};
use folio_server::{Content, run_server, server_config_from_folio_config};
use folio_templates::{EmbeddedSource, RecoveryPolicy, RegistryOptions, TemplateRegistry};

use crate::error::CliError;
use crate::output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the content cannot be loaded
    /// or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            log_level: None,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        crate::init_tracing(self.verbose, &config.log.level);

        output::serving(&config);

        let content = start_content(&config)?;
        let result = run_server(server_config_from_folio_config(&config), content.clone()).await;

        // Stop the watchers in reverse start order
        content.pages.close();
        content.posts.close();
        content.templates.close();

        result?;
        output::stopped();
        Ok(())
    }
}

/// Start the template registry, then the post and page stores.
fn start_content(config: &Config) -> Result<Content, CliError> {
    let dirs = &config.content_resolved;

    let options = RegistryOptions {
        dir: dirs.template_dir.clone(),
        with_language_select: config.languages.multilingual,
        policy: recovery_policy(config),
    };
    let templates = TemplateRegistry::start(options, EmbeddedSource)?;

    // Watches already started stop when their owners drop on error
    let filter = post_filter(Some(&dirs.post_extension));
    std::fs::create_dir_all(&dirs.post_dir)?;
    let posts = PostStore::open(&dirs.post_dir, filter.clone())?;
    std::fs::create_dir_all(&dirs.page_dir)?;
    let pages = PostStore::open(&dirs.page_dir, filter)?;

    Ok(Content {
        templates: Arc::new(templates),
        posts: Arc::new(posts),
        pages: Arc::new(pages),
    })
}

fn recovery_policy(config: &Config) -> RecoveryPolicy {
    RecoveryPolicy {
        rewrite_on_invalid: config.templates.rewrite_on_invalid,
        rewrite_on_missing: config.templates.rewrite_on_missing,
    }
}
