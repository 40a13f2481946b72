//! TileScript configuration system
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Environment variables (TILESCRIPT_LOG, TILESCRIPT_PACING_MS)
//! 3. Project-level (tilescript.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use tilescript::util::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert_eq!(config.interpreter.pacing_cap_ms, 500);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project-level config file name
pub const CONFIG_FILE_NAME: &str = "tilescript.toml";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngineConfig {
    /// Interpreter limits and pacing
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    /// Movement bridge settings
    #[serde(default)]
    pub movement: MovementConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Interpreter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterpreterConfig {
    /// Upper bound of the visual pause after a timed action
    #[serde(default = "default_pacing_cap_ms")]
    pub pacing_cap_ms: u64,
    /// Iterations a single `while` loop may run
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: usize,
    /// Nested subroutine calls
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
}

fn default_pacing_cap_ms() -> u64 {
    500
}

fn default_max_loop_iterations() -> usize {
    10_000
}

fn default_max_call_depth() -> usize {
    64
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            pacing_cap_ms: default_pacing_cap_ms(),
            max_loop_iterations: default_max_loop_iterations(),
            max_call_depth: default_max_call_depth(),
        }
    }
}

impl InterpreterConfig {
    pub fn pacing_cap(&self) -> Duration {
        Duration::from_millis(self.pacing_cap_ms)
    }
}

/// Movement configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementConfig {
    /// Tween time of one tile step at speed 1.0
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
}

fn default_step_ms() -> u64 {
    300
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            step_ms: default_step_ms(),
        }
    }
}

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// One of debug, info, warn, error
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Override values from the environment
    pub fn apply_env(&mut self) {
        if let Ok(level) = std::env::var("TILESCRIPT_LOG") {
            self.log.level = level;
        }
        if let Some(ms) = std::env::var("TILESCRIPT_PACING_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.interpreter.pacing_cap_ms = ms;
        }
    }
}

/// Load configuration
///
/// An explicit path must exist. Without one, `tilescript.toml` in `dir` is
/// used when present, defaults otherwise.
pub fn load_config(
    explicit: Option<&Path>,
    dir: &Path,
) -> Result<EngineConfig, ConfigError> {
    let path: PathBuf = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.to_path_buf()));
            }
            p.to_path_buf()
        }
        None => {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if !candidate.exists() {
                return Ok(EngineConfig::default());
            }
            candidate
        }
    };

    let content = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    EngineConfig::from_toml(&content)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(toml::de::Error),
    #[error("Config serialize error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
}

#[cfg(test)]
mod tests;
