//! Configuration management for the wiki engine.
//!
//! Parses `wiki.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [site]
//! name = "Team Wiki"
//! base_path = "/wiki"
//!
//! [engine]
//! record_compilation_metrics = true
//! enable_public_profiles = false
//! max_nesting_depth = 10
//!
//! [metrics]
//! log_path = "logs/compile.jsonl"
//!
//! [[emojis]]
//! shortcut = "smile"
//! name = "Smile"
//! ```
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.name`
//! - `site.base_path`
//! - `metrics.log_path`

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use wiki_engine::{DEFAULT_MAX_NESTING_DEPTH, Emoji, EngineConfiguration};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override site name.
    pub site_name: Option<String>,
    /// Override base path.
    pub base_path: Option<String>,
    /// Override statistics recording.
    pub record_compilation_metrics: Option<bool>,
    /// Override public profile links.
    pub enable_public_profiles: Option<bool>,
    /// Override nesting depth limit.
    pub max_nesting_depth: Option<usize>,
    /// Override statistics log file.
    pub metrics_log_path: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "wiki.toml";

/// Upper bound for `engine.max_nesting_depth`.
const MAX_NESTING_DEPTH_LIMIT: usize = 64;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site identity.
    pub site: SiteConfig,
    /// Engine behaviour.
    pub engine: EngineSection,
    /// Statistics output (paths are relative strings from TOML).
    metrics: MetricsConfigRaw,
    /// Known emojis.
    pub emojis: Vec<EmojiConfig>,

    /// Resolved statistics configuration (set after loading).
    #[serde(skip)]
    pub metrics_resolved: MetricsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Site configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name rendered by `##SiteName`.
    pub name: String,
    /// URL prefix of generated links.
    pub base_path: String,
}

/// Engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Whether compile statistics are reported.
    pub record_compilation_metrics: bool,
    /// Whether `##Profile` links to public profiles.
    pub enable_public_profiles: bool,
    /// Maximum depth of recursive compilation.
    pub max_nesting_depth: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            record_compilation_metrics: false,
            enable_public_profiles: false,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// Raw metrics configuration as parsed from TOML (paths as strings).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetricsConfigRaw {
    log_path: Option<String>,
}

/// Resolved metrics configuration with absolute paths.
#[derive(Debug, Default)]
pub struct MetricsConfig {
    /// JSON-lines statistics file; `None` logs statistics through tracing.
    pub log_path: Option<PathBuf>,
}

/// Emoji entry.
#[derive(Debug, Deserialize)]
pub struct EmojiConfig {
    /// Lookup key, e.g. `smile`.
    pub shortcut: String,
    /// Display name used as `alt` text.
    #[serde(default)]
    pub name: Option<String>,
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
        /// Config field path (e.g., "`site.base_path`").
        field: String,
        /// Error message (e.g., "${`WIKI_BASE`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `wiki.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// CLI settings are applied after loading and path resolution, and the
    /// result is validated again.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// a value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let discovered = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Some(path.to_path_buf())
            }
            None => std::env::current_dir()
                .ok()
                .and_then(|cwd| Self::discover_config(&cwd)),
        };

        let mut config = match discovered {
            Some(path) => Self::load_from_file(&path)?,
            None => {
                tracing::debug!("no {CONFIG_FILENAME} found, using defaults");
                Self::default()
            }
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Build the engine configuration snapshot.
    #[must_use]
    pub fn engine_configuration(&self) -> EngineConfiguration {
        let mut engine = EngineConfiguration::new()
            .with_base_path(self.site.base_path.as_str())
            .with_site_name(self.site.name.as_str())
            .with_compilation_metrics(self.engine.record_compilation_metrics)
            .with_public_profiles(self.engine.enable_public_profiles)
            .with_max_nesting_depth(self.engine.max_nesting_depth);
        for emoji in &self.emojis {
            engine = engine.with_emoji(Emoji {
                shortcut: bare_shortcut(&emoji.shortcut).to_owned(),
                name: emoji.name.clone(),
            });
        }
        engine
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(site_name) = &settings.site_name {
            self.site.name.clone_from(site_name);
        }
        if let Some(base_path) = &settings.base_path {
            self.site.base_path.clone_from(base_path);
        }
        if let Some(enabled) = settings.record_compilation_metrics {
            self.engine.record_compilation_metrics = enabled;
        }
        if let Some(enabled) = settings.enable_public_profiles {
            self.engine.enable_public_profiles = enabled;
        }
        if let Some(depth) = settings.max_nesting_depth {
            self.engine.max_nesting_depth = depth;
        }
        if let Some(log_path) = &settings.metrics_log_path {
            self.metrics_resolved.log_path = Some(log_path.clone());
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "discovered configuration");
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

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
        self.validate_site()?;
        self.validate_engine()?;
        self.validate_emojis()?;
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        let base_path = &self.site.base_path;
        if !(base_path.is_empty()
            || base_path.starts_with('/')
            || base_path.starts_with("http://")
            || base_path.starts_with("https://"))
        {
            return Err(ConfigError::Validation(
                "site.base_path must be empty or start with /, http:// or https://".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        let depth = self.engine.max_nesting_depth;
        if depth == 0 {
            return Err(ConfigError::Validation(
                "engine.max_nesting_depth must be greater than 0".to_owned(),
            ));
        }
        if depth > MAX_NESTING_DEPTH_LIMIT {
            return Err(ConfigError::Validation(format!(
                "engine.max_nesting_depth cannot exceed {MAX_NESTING_DEPTH_LIMIT}"
            )));
        }
        Ok(())
    }

    fn validate_emojis(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, emoji) in self.emojis.iter().enumerate() {
            let shortcut = bare_shortcut(&emoji.shortcut);
            if shortcut.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "emojis[{index}].shortcut cannot be empty"
                )));
            }
            if !shortcut
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'))
            {
                return Err(ConfigError::Validation(format!(
                    "emojis[{index}].shortcut '{shortcut}' may only contain letters, digits, _, + and -"
                )));
            }
            if !seen.insert(shortcut.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "emojis[{index}].shortcut '{shortcut}' is defined more than once"
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.site.name = expand::expand_env(&self.site.name, "site.name")?;
        self.site.base_path = expand::expand_env(&self.site.base_path, "site.base_path")?;

        if let Some(ref log_path) = self.metrics.log_path {
            self.metrics.log_path = Some(expand::expand_env(log_path, "metrics.log_path")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.metrics_resolved = MetricsConfig {
            log_path: self
                .metrics
                .log_path
                .as_deref()
                .map(|path| config_dir.join(path)),
        };
    }
}

/// Shortcut without surrounding whitespace and `%`.
fn bare_shortcut(shortcut: &str) -> &str {
    shortcut.trim().trim_matches('%').trim()
}
