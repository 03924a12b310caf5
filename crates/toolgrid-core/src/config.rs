//! Configuration management for toolgrid.
//!
//! Loads configuration from ${TOOLGRID_HOME}/config.toml with sensible defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for toolgrid configuration and data directories.
    //!
    //! TOOLGRID_HOME resolution order:
    //! 1. TOOLGRID_HOME environment variable (if set)
    //! 2. ~/.config/toolgrid (default)
    //! 3. ./.toolgrid when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the toolgrid home directory.
    pub fn toolgrid_home() -> PathBuf {
        if let Ok(home) = std::env::var("TOOLGRID_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".toolgrid"),
            |h| h.join(".config").join("toolgrid"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        toolgrid_home().join("config.toml")
    }

    /// Returns the directory the log file is written to.
    pub fn logs_dir() -> PathBuf {
        toolgrid_home().join("logs")
    }
}

/// Where runnable items come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory whose regular files are the runnable items.
    pub dir: PathBuf,
    /// Optional git remote cloned (or pulled) into `dir` before listing.
    pub repo_url: Option<String>,
    /// Remove the cloned `dir` when the dashboard exits (only with `repo_url`).
    pub cleanup_on_exit: bool,
    /// List dot-files as items too.
    pub include_hidden: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("toolgrid-items"),
            repo_url: None,
            cleanup_on_exit: false,
            include_hidden: false,
        }
    }
}

/// How a selected item is executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Program the item path is passed to. Empty runs the item directly.
    pub interpreter: String,
    /// Extra environment for the child process.
    pub env: BTreeMap<String, String>,
    /// Exact stderr texts that are informational rather than errors.
    pub benign_stderr: Vec<String>,
    /// Capacity of the producer -> renderer line channel.
    pub channel_capacity: usize,
}

impl RunnerConfig {
    pub const APT_CLI_WARNING: &str =
        "WARNING: apt does not have a stable CLI interface. Use with caution in scripts.";
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let env = BTreeMap::from([
            ("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string()),
            ("APT_LISTCHANGES_FRONTEND".to_string(), "none".to_string()),
        ]);
        Self {
            interpreter: "bash".to_string(),
            env,
            benign_stderr: vec![Self::APT_CLI_WARNING.to_string()],
            channel_capacity: 256,
        }
    }
}

/// Dashboard look and layout limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Title shown centered in the header row.
    pub title: String,
    /// Narrowest frame drawn, even on smaller terminals.
    pub min_width: u16,
    /// Fewest content rows drawn, even on shorter terminals.
    pub min_content_height: u16,
    /// Narrowest text area a grid column may have.
    pub min_column_width: u16,
    /// How long the renderer waits for output before re-checking (ms).
    pub poll_interval_ms: u64,
    /// How long an inline notice stays on the prompt line (ms).
    pub notice_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "toolgrid - Linux System Tools".to_string(),
            min_width: 40,
            min_content_height: 3,
            min_column_width: 10,
            poll_interval_ms: 50,
            notice_ms: 1500,
        }
    }
}

impl UiConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_ms)
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub runner: RunnerConfig,
    pub ui: UiConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Applies command-line overrides on top of the loaded file.
    #[must_use]
    pub fn with_overrides(
        mut self,
        dir: Option<PathBuf>,
        repo_url: Option<String>,
        interpreter: Option<String>,
    ) -> Self {
        if let Some(dir) = dir {
            self.source.dir = dir;
        }
        if let Some(url) = repo_url {
            let trimmed = url.trim();
            self.source.repo_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(interpreter) = interpreter {
            self.runner.interpreter = interpreter.trim().to_string();
        }
        self
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}
