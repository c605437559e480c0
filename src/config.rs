//! Configuration management for schema mapping
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (sda.toml)
//! - Environment variables (SDA__*)
//!
//! ## Example config file (sda.toml):
//! ```toml
//! [graph]
//! root = "root"
//! sink = "DELETE"
//! separator = "."
//!
//! [rewrite]
//! strict = false
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for the mapper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Node naming used by the graph builders
    #[serde(default)]
    pub graph: GraphConfig,

    /// Rewriting behavior
    #[serde(default)]
    pub rewrite: RewriteConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Node naming for schema and annotation graphs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Identifier of the root node in G and S
    #[serde(default = "default_root")]
    pub root: String,

    /// Identifier of the sink node in S
    #[serde(default = "default_sink")]
    pub sink: String,

    /// Separator between path segments
    #[serde(default = "default_separator")]
    pub separator: String,
}

/// Rewrite configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Reject rewrites that would have to extend a typing graph
    #[serde(default)]
    pub strict: bool,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_root() -> String {
    "root".to_string()
}

fn default_sink() -> String {
    "DELETE".to_string()
}

fn default_separator() -> String {
    ".".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            sink: default_sink(),
            separator: default_separator(),
        }
    }
}

impl GraphConfig {
    /// Join a parent path and a key
    pub fn join(&self, parent: &str, key: &str) -> String {
        format!("{}{}{}", parent, self.separator, key)
    }
}

impl MappingConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["sda.toml", ".sda.toml", "config/sda.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "sda", "sda") {
            let xdg_config = config_dir.config_dir().join("sda.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SDA__GRAPH__SINK=... etc.
        builder = builder.add_source(
            Environment::with_prefix("SDA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Serialize a value according to the configured output format
    pub fn render<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self.output.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}
