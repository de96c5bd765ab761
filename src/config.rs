//! Configuration management for metadata extraction
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (proto-metadata.toml)
//! - Environment variables (PROTO_METADATA__*)
//!
//! ## Example config file (proto-metadata.toml):
//! ```toml
//! [extensions]
//! meta_type_option = "meta.type"
//! term = ["meta.msg.classification_enum"]
//!
//! [visitors]
//! enabled = ["term", "tag", "owner"]
//!
//! [ownership]
//! default_kind = "group"
//! default_type = "TECHNICAL_OWNER"
//!
//! [output]
//! format = "compact"
//!
//! [load]
//! skip_prefixes = ["target/", "vendor/"]
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extension::DEFAULT_META_TYPE_OPTION;
use crate::fact::{OwnerKind, OwnershipType};
use crate::graph::LoadConfig;

/// Main configuration for extraction
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractConfig {
    /// Which extensions carry which concern
    #[serde(default)]
    pub extensions: ExtensionsConfig,

    /// Visitor pipeline
    #[serde(default)]
    pub visitors: VisitorsConfig,

    #[serde(default)]
    pub ownership: OwnershipConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Descriptor discovery
    #[serde(default)]
    pub load: LoadSettings,
}

/// Extension selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Option that classifies extension declarations
    #[serde(default = "default_meta_type_option")]
    pub meta_type_option: String,

    /// Fixed term extensions; empty selects by meta type
    #[serde(default)]
    pub term: Vec<String>,

    #[serde(default)]
    pub tag: Vec<String>,

    #[serde(default)]
    pub owner: Vec<String>,
}

/// Visitor pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorsConfig {
    /// Visitors to run, in order (`term`, `tag`, `owner`, `field`)
    #[serde(default = "default_visitors")]
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OwnershipConfig {
    /// Kind assumed for owner names without a `user:`/`group:` prefix
    #[serde(default)]
    pub default_kind: OwnerKind,

    #[serde(default)]
    pub default_type: OwnershipType,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    /// One JSON fact per line, tagged with its entity
    Compact,
}

/// Directory loading filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSettings {
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,

    #[serde(default)]
    pub include_prefixes: Vec<String>,
}

// Default value functions
fn default_meta_type_option() -> String {
    DEFAULT_META_TYPE_OPTION.to_string()
}

fn default_visitors() -> Vec<String> {
    vec!["term".to_string(), "tag".to_string(), "owner".to_string()]
}

fn default_skip_prefixes() -> Vec<String> {
    LoadConfig::default().skip_prefixes
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            meta_type_option: default_meta_type_option(),
            term: Vec::new(),
            tag: Vec::new(),
            owner: Vec::new(),
        }
    }
}

impl Default for VisitorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_visitors(),
        }
    }
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            skip_prefixes: default_skip_prefixes(),
            include_prefixes: Vec::new(),
        }
    }
}

impl ExtractConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "proto-metadata.toml",
            ".proto-metadata.toml",
            "config/proto-metadata.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(dirs) = directories::ProjectDirs::from("io", "datahub", "proto-metadata") {
            let xdg_config = dirs.config_dir().join("proto-metadata.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (PROTO_METADATA__*)
        builder = builder.add_source(
            Environment::with_prefix("PROTO_METADATA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Loader filters for directory inputs
    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            skip_prefixes: self.load.skip_prefixes.clone(),
            include_prefixes: self.load.include_prefixes.clone(),
        }
    }
}
