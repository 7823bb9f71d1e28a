//! Configuration for the handoff coordinator.
//!
//! Settings are read from `handoff.toml` at the workspace root. The file is
//! deliberately *outside* the `.handoff/` store area: `reset` clears the
//! store wholesale, and configuration must survive it.
//!
//! # Configuration File Format
//!
//! ```toml
//! [watcher]
//! debounce_ms = 500
//!
//! [autocomplete]
//! enabled = true
//! quiet_secs = 5
//! ignore = [".git", "target", "node_modules"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The configuration file name, relative to the workspace root.
pub const CONFIG_FILE: &str = "handoff.toml";

/// The quiet period is clamped to this range: anything shorter fires on
/// ordinary typing pauses, anything longer stops feeling autonomous.
const QUIET_SECS_MIN: u64 = 2;
const QUIET_SECS_MAX: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HandoffConfig {
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub autocomplete: AutocompleteConfig,
}

/// Synchronization-watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatcherConfig {
    /// How long the store must stay quiet before a reload fires.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Inactivity-completion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutocompleteConfig {
    /// When false, the heuristic performs no subscription at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Workspace quiet period before a stage is considered complete.
    #[serde(default = "default_quiet_secs")]
    pub quiet_secs: u64,
    /// Directory names whose save events never count as activity.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_enabled() -> bool {
    true
}

fn default_quiet_secs() -> u64 {
    5
}

fn default_ignore() -> Vec<String> {
    vec![".git".into(), "target".into(), "node_modules".into()]
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            quiet_secs: default_quiet_secs(),
            ignore: default_ignore(),
        }
    }
}

impl WatcherConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl AutocompleteConfig {
    /// The configured quiet period, clamped to the supported range.
    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.quiet_secs.clamp(QUIET_SECS_MIN, QUIET_SECS_MAX))
    }
}

impl HandoffConfig {
    /// Load configuration from `<workspace>/handoff.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load(workspace: &Path) -> Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write a default `handoff.toml` to the workspace root. Fails if one
    /// already exists.
    pub fn write_default(workspace: &Path) -> Result<PathBuf> {
        let path = workspace.join(CONFIG_FILE);
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }

        let content =
            toml::to_string_pretty(&Self::default()).context("Failed to serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }
}
