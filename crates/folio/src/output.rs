//! Messages the commands print on stderr.

use std::fmt::Display;
use std::path::Path;

use console::{Term, style};
use folio_config::Config;

use crate::commands::init::InitReport;
use crate::error::CliError;

fn line(message: impl Display) {
    let _ = Term::stderr().write_line(&message.to_string());
}

/// Report a failed command in red.
pub(crate) fn failed(err: &CliError) {
    line(style(format!("Error: {err}")).red());
}

/// Print the address and directories `folio serve` is about to use.
pub(crate) fn serving(config: &Config) {
    for message in serving_banner(config) {
        line(message);
    }
}

pub(crate) fn stopped() {
    line(style("Server stopped").green());
}

/// Report which files `folio init` wrote and which it left alone.
pub(crate) fn initialized(dir: &Path, report: &InitReport) {
    for path in &report.skipped {
        line(style(format!("{} already exists, left untouched", path.display())).yellow());
    }
    line(style(init_summary(dir, report)).green());
}

/// Report the blank file written by `folio new`.
pub(crate) fn created(path: &Path) {
    line(style(format!("Created {}", path.display())).green());
    line("It stays hidden until \"invisible\" is set to false.");
}

fn serving_banner(config: &Config) -> Vec<String> {
    let dirs = &config.content_resolved;
    let mut banner = vec![
        format!("Serving on http://{}:{}", config.server.host, config.server.port),
        format!("Posts: {}", dirs.post_dir.display()),
        format!("Pages: {}", dirs.page_dir.display()),
        format!("Templates: {}", dirs.template_dir.display()),
    ];
    if config.languages.multilingual {
        banner.push(format!("Languages: {}", config.languages.available.join(", ")));
    }
    banner
}

fn init_summary(dir: &Path, report: &InitReport) -> String {
    match report.written.len() {
        0 => format!("{} already holds a blog, nothing written", dir.display()),
        1 => format!("Initialized blog in {} (1 file written)", dir.display()),
        n => format!("Initialized blog in {} ({n} files written)", dir.display()),
    }
}
