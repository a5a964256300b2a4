//! Folio CLI - Blog engine.
//!
//! Provides commands for:
//! - `serve`: Serve the blog and keep it in sync with the filesystem
//! - `init`: Create a new blog from the embedded defaults
//! - `new`: Create a blank post or page

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{InitArgs, NewArgs, ServeArgs};
use error::CliError;

/// Folio - Blog engine.
#[derive(Parser)]
#[command(name = "folio", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the blog.
    Serve(ServeArgs),
    /// Create a new blog in a directory.
    Init(InitArgs),
    /// Create a blank post (or page).
    New(NewArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => tokio::runtime::Runtime::new()
            .map_err(CliError::from)
            .and_then(|rt| rt.block_on(args.execute())),
        Commands::Init(args) => args.execute(),
        Commands::New(args) => args.execute(),
    };

    if let Err(err) = result {
        output::failed(&err);
        std::process::exit(1);
    }
}

/// Initialize tracing.
///
/// `--verbose` enables DEBUG level, otherwise use `RUST_LOG` or the
/// configured level.
pub(crate) fn init_tracing(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
