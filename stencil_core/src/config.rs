use crate::materialize::{DEFAULT_MAX_DEPTH, MAX_DEPTH_CEILING};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Raw,
    Hex,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(OutputFormat::Raw),
            "hex" => Ok(OutputFormat::Hex),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown output format '{other}' (expected raw, hex or json)"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Raw => "raw",
            OutputFormat::Hex => "hex",
            OutputFormat::Json => "json",
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct GeneratorSettings {
    /// Fixed seed for reproducible output; drawn at random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_count")]
    pub count: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

pub fn default_count() -> u64 {
    1
}

pub fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl GeneratorSettings {
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            seed: None,
            count: default_count(),
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
    /// One file per sample in this directory; stdout when absent.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct StencilConfig {
    #[serde(default)]
    pub generator: GeneratorSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

impl StencilConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;
        let config = Self::from_toml(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let depth = self.generator.max_depth;
        if depth > MAX_DEPTH_CEILING {
            return Err(format!(
                "generator.max-depth {depth} exceeds the limit of {MAX_DEPTH_CEILING}"
            ));
        }
        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
