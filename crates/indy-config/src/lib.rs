//! Configuration for the `indy` tools.
//!
//! Settings live in an `indy.toml` at the root of the migrated source tree:
//! ```toml
//! [logging]
//! level = "info"          # or any `EnvFilter` directive string
//! json = false
//!
//! [batch]
//! include = ["**/*.java"]
//! exclude = ["**/generated/**"]
//! threads = 0             # 0 = one worker per CPU
//!
//! [output]
//! indent_width = 4
//! ```
//! Every table and key is optional.

use std::path::{Path, PathBuf};
use std::sync::Once;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// File names searched for by [`discover_config_path`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["indy.toml", ".indy.toml"];

const MAX_INDENT_WIDTH: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndyConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Which files a batch run picks up and how many run at once.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Layout of code printed from the rewritten tree.
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    /// Maps plain level names (any casing, `warning` included) to their
    /// `EnvFilter` spelling. Other input is passed through as directives.
    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let level = input.trim();
        let lowered = level.to_ascii_lowercase();
        let canonical = match lowered.as_str() {
            "" => "info",
            "warning" => "warn",
            "trace" | "debug" | "info" | "warn" | "error" => lowered.as_str(),
            _ => level,
        };
        canonical.to_owned()
    }

    /// The effective filter: the configured level with `RUST_LOG` merged in.
    ///
    /// Invalid directives fall back to whichever half is valid, and to `info`
    /// when neither is.
    pub fn env_filter(&self) -> EnvFilter {
        let configured = Self::normalize_level_directives(&self.level);
        let from_env = std::env::var("RUST_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let merged = from_env.as_deref().map(|env| {
            EnvFilter::try_new(format!("{configured},{}", env.trim()))
                .or_else(|_| EnvFilter::try_new(env.trim()))
        });
        match merged {
            Some(Ok(filter)) => filter,
            _ => EnvFilter::try_new(&configured)
                .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::INFO.into())),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Globs, relative to the walked root, a file must match to be migrated.
    #[serde(default = "BatchConfig::default_include")]
    pub include: Vec<String>,

    /// Globs that win over `include`.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Worker threads; `0` picks one per available CPU.
    #[serde(default)]
    pub threads: usize,
}

impl BatchConfig {
    fn default_include() -> Vec<String> {
        vec!["**/*.java".to_owned()]
    }

    /// Compiles the include and exclude globs.
    pub fn file_filter(&self) -> Result<FileFilter, ConfigError> {
        Ok(FileFilter {
            include: build_glob_set(&self.include)?,
            exclude: build_glob_set(&self.exclude)?,
        })
    }

    pub fn effective_threads(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism()
                .map(|threads| threads.get())
                .unwrap_or(1),
            threads => threads,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            include: Self::default_include(),
            exclude: Vec::new(),
            threads: 0,
        }
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ConfigError::Glob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::Glob {
        pattern: patterns.join(", "),
        source,
    })
}

/// Compiled [`BatchConfig`] globs.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl FileFilter {
    /// Whether the file at `relative` (to the walked root) is migrated.
    pub fn matches(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Spaces per nesting level in reprinted declarations.
    #[serde(default = "OutputConfig::default_indent_width")]
    pub indent_width: usize,
}

impl OutputConfig {
    fn default_indent_width() -> usize {
        4
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent_width: Self::default_indent_width(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid glob `{pattern}`: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("invalid config value `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The `Display` form quotes the offending source line; keep only the
        // message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl IndyConfig {
    /// Loads a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::load_from_str(&text)?;
        tracing::debug!(target = "indy.config", path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parses and validates TOML config text.
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: IndyConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.indent_width == 0 || self.output.indent_width > MAX_INDENT_WIDTH {
            return Err(ConfigError::Invalid {
                key: "output.indent_width",
                message: format!(
                    "expected a value between 1 and {MAX_INDENT_WIDTH}, got {}",
                    self.output.indent_width
                ),
            });
        }
        self.batch.file_filter()?;
        Ok(())
    }
}

/// Finds the config file of a source tree, looking only at `root` itself.
pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Loads the config of the tree at `root`, or the defaults when it has none.
pub fn load_for_root(root: &Path) -> Result<(IndyConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(root) else {
        return Ok((IndyConfig::default(), None));
    };
    let config = IndyConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// Only the first call has an effect. A subscriber installed by someone else
/// is left in place.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    TRACING_INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(config.env_filter());
        let installed = if config.json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_ansi(false),
                )
                .try_init()
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .try_init()
        };
        if installed.is_err() {
            tracing::debug!(
                target = "indy.config",
                "global tracing subscriber already installed"
            );
        }
    });
}

#[cfg(test)]
mod tests;
