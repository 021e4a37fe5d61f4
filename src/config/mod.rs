//! Configuration loading and management.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::cycles::CycleOptions;
use crate::graph::ResolutionOptions;
use crate::rules::long_chain::DEFAULT_MAX_LENGTH;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target reference resolution.
    pub resolution: ResolutionConfig,
    /// Cycle search limits.
    pub cycles: CyclesConfig,
    /// Rule settings.
    pub rules: RulesConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `LOOPSCAN_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::core::Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("LOOPSCAN_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from directory, looking for loopscan.toml or
    /// .loopscan/loopscan.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    /// Env vars with `LOOPSCAN_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("loopscan.toml")))
            .merge(Toml::file(dir.join(".loopscan/loopscan.toml")))
            .merge(Env::prefixed("LOOPSCAN_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Create default config file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }
}

/// Target reference resolution configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Resolve bare names against other installations when not found locally.
    pub cross_instance: bool,
}

impl From<&ResolutionConfig> for ResolutionOptions {
    fn from(config: &ResolutionConfig) -> Self {
        Self {
            cross_instance: config.cross_instance,
        }
    }
}

/// Cycle search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CyclesConfig {
    /// Longest path, in repositories, the search will extend.
    pub max_path_length: usize,
    /// Maximum number of distinct cycles to collect.
    pub max_cycles: usize,
}

impl Default for CyclesConfig {
    fn default() -> Self {
        let options = CycleOptions::default();
        Self {
            max_path_length: options.max_path_length,
            max_cycles: options.max_cycles,
        }
    }
}

impl From<&CyclesConfig> for CycleOptions {
    fn from(config: &CyclesConfig) -> Self {
        Self {
            max_path_length: config.max_path_length,
            max_cycles: config.max_cycles,
        }
    }
}

/// Rules configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Chains with more repositories than this are reported.
    pub max_chain_length: usize,
    /// Rule names to skip.
    pub disabled: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_chain_length: DEFAULT_MAX_LENGTH,
            disabled: Vec::new(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
    /// Color output.
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format.
    Json,
    /// Markdown format.
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {s}. Use 'text', 'json', or 'md'")),
        }
    }
}
