//! Configuration management for Folio.
//!
//! Parses `folio.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `content.post_dir`, `content.page_dir`, `content.template_dir`,
//!   `content.asset_dir`

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override log level.
    pub log_level: Option<String>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "folio.toml";

/// Log levels accepted by `log.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Contents of a freshly initialized `folio.toml`.
const DEFAULT_TOML: &str = r#"[server]
host = "127.0.0.1"
port = 3000

[content]
post_dir = "posts"
page_dir = "pages"
template_dir = "templates"
asset_dir = "assets"
post_extension = "md"

[templates]
# Recreate template fragments that are deleted while the server runs.
rewrite_on_missing = true
# Overwrite template fragments that no longer compile.
rewrite_on_invalid = false

[languages]
multilingual = false
available = ["en"]

[log]
level = "info"
"#;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Content directories (relative strings from TOML).
    content: ContentConfigRaw,
    /// Template recovery configuration.
    pub templates: TemplatesConfig,
    /// Language configuration.
    pub languages: LanguagesConfig,
    /// Logging configuration.
    pub log: LogConfig,

    /// Resolved content configuration (set after loading).
    #[serde(skip)]
    pub content_resolved: ContentConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
        }
    }
}

/// Raw content configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContentConfigRaw {
    post_dir: Option<String>,
    page_dir: Option<String>,
    template_dir: Option<String>,
    asset_dir: Option<String>,
    post_extension: Option<String>,
}

/// Resolved content configuration with absolute paths.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ContentConfig {
    /// Directory of blog posts.
    pub post_dir: PathBuf,
    /// Directory of standalone pages.
    pub page_dir: PathBuf,
    /// Directory of template fragments.
    pub template_dir: PathBuf,
    /// Directory of static files served under `/assets`.
    pub asset_dir: PathBuf,
    /// Extension of post files, without the leading dot.
    pub post_extension: String,
}

impl ContentConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            post_dir: base.join("posts"),
            page_dir: base.join("pages"),
            template_dir: base.join("templates"),
            asset_dir: base.join("assets"),
            post_extension: "md".to_owned(),
        }
    }
}

/// Template recovery configuration.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Overwrite fragments that no longer compile.
    pub rewrite_on_invalid: bool,
    /// Recreate fragments that were deleted.
    pub rewrite_on_missing: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            rewrite_on_invalid: false,
            rewrite_on_missing: true,
        }
    }
}

/// Language configuration.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LanguagesConfig {
    /// Whether visitors choose a language before reading.
    pub multilingual: bool,
    /// Language codes offered by the language chooser.
    pub available: Vec<String>,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            multilingual: false,
            available: vec!["en".to_owned()],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level when `RUST_LOG` is not set.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`BLOG_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `folio.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Contents of the default configuration file.
    #[must_use]
    pub fn default_toml() -> &'static str {
        DEFAULT_TOML
    }

    /// Directory relative paths were resolved against.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Path> {
        self.config_path.as_deref().and_then(Path::parent)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(level) = &settings.log_level {
            self.log.level.clone_from(level);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            content: ContentConfigRaw::default(),
            templates: TemplatesConfig::default(),
            languages: LanguagesConfig::default(),
            log: LogConfig::default(),
            content_resolved: ContentConfig::with_base(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_content()?;
        self.validate_languages()?;
        self.validate_log()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_content(&self) -> Result<(), ConfigError> {
        let extension = &self.content_resolved.post_extension;
        require_non_empty(extension, "content.post_extension")?;
        if extension.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "content.post_extension cannot contain path separators".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_languages(&self) -> Result<(), ConfigError> {
        if self.languages.multilingual && self.languages.available.is_empty() {
            return Err(ConfigError::Validation(
                "languages.available cannot be empty when languages.multilingual is set"
                    .to_owned(),
            ));
        }
        if let Some(lang) = self.languages.available.iter().find(|l| l.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "languages.available contains an empty language code: {lang:?}"
            )));
        }
        Ok(())
    }

    fn validate_log(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "log.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log.level
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        let content = &mut self.content;
        for (value, field) in [
            (&mut content.post_dir, "content.post_dir"),
            (&mut content.page_dir, "content.page_dir"),
            (&mut content.template_dir, "content.template_dir"),
            (&mut content.asset_dir, "content.asset_dir"),
        ] {
            if let Some(dir) = value {
                *dir = expand::expand_env(dir, field)?;
            }
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.content_resolved = ContentConfig {
            post_dir: resolve(self.content.post_dir.as_deref(), "posts"),
            page_dir: resolve(self.content.page_dir.as_deref(), "pages"),
            template_dir: resolve(self.content.template_dir.as_deref(), "templates"),
            asset_dir: resolve(self.content.asset_dir.as_deref(), "assets"),
            post_extension: self
                .content
                .post_extension
                .as_deref()
                .unwrap_or("md")
                .trim_start_matches('.')
                .to_owned(),
        };
    }
}
