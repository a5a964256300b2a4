//! HTTP server for Folio blogs.
//!
//! Serves the index, posts and pages by rendering the live template bundles
//! with data read from the post and page stores. Handlers only call the
//! stores' read accessors; the stores and the template registry keep
//! themselves in sync with the filesystem in the background.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use folio_server::{Content, ServerConfig, run_server};
//!
//! let content = Content {
//!     templates: Arc::new(templates),
//!     posts: Arc::new(posts),
//!     pages: Arc::new(pages),
//! };
//! run_server(ServerConfig::default(), content).await?;
//! ```
//!
//! # Routes
//!
//! ```text
//! /               index bundle   (language negotiated)
//! /posts/{id}     post bundle    (language negotiated)
//! /pages/{id}     post bundle    (language negotiated)
//! /changelang     language-select bundle
//! /heartbeat      200 OK
//! /assets/*       files from the asset directory
//! ```

mod app;
mod error;
mod handlers;
mod language;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use folio_posts::PostStore;
use folio_templates::TemplateRegistry;
use state::AppState;

pub use error::ServerError;

/// Languages offered by the site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Languages {
    /// Require a language choice before serving content.
    pub multilingual: bool,
    /// Language codes, in display order.
    pub available: Vec<String>,
}

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory served under `/assets`.
    pub asset_dir: PathBuf,
    /// Language negotiation settings.
    pub languages: Languages,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            asset_dir: PathBuf::from("assets"),
            languages: Languages {
                multilingual: false,
                available: vec!["en".to_owned()],
            },
        }
    }
}

/// The live content the server reads from.
#[derive(Clone)]
pub struct Content {
    pub templates: Arc<TemplateRegistry>,
    pub posts: Arc<PostStore>,
    pub pages: Arc<PostStore>,
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address is invalid, the listener cannot be bound
/// or serving fails.
pub async fn run_server(config: ServerConfig, content: Content) -> Result<(), ServerError> {
    let address = format!("{}:{}", config.host, config.port);
    let addr: SocketAddr = address
        .parse()
        .map_err(|source| ServerError::Address { address, source })?;

    let state = Arc::new(AppState {
        templates: content.templates,
        posts: content.posts,
        pages: content.pages,
        languages: config.languages,
    });
    let app = app::create_router(state, &config.asset_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    tracing::info!(address = %addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for Ctrl+C; shutting down");
        return;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from Folio config.
#[must_use]
pub fn server_config_from_folio_config(config: &folio_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        asset_dir: config.content_resolved.asset_dir.clone(),
        languages: Languages {
            multilingual: config.languages.multilingual,
            available: config.languages.available.clone(),
        },
    }
}
