//! # Configuration
//!
//! Settings are merged from three sources, lowest priority first:
//! 1. An optional TOML file (`--config`)
//! 2. Environment variables (`GRAPH_DATA_DIR`, `GRAPH_CSV`)
//! 3. Command-line flags
//!
//! clap already folds environment variables into the flag values, so the
//! merge here only has to prefer `Overrides` over `FileConfig`.

use graphd_core::{BatchPolicy, GraphError, LoadOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "data/graphfd";

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 1327;

/// Config file contents. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub graph_csv: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub batch_policy: Option<BatchPolicy>,
    pub csv_delimiter: Option<char>,
    pub csv_has_headers: Option<bool>,
}

impl FileConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GraphError::Config(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| GraphError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML config text.
    pub fn parse(content: &str) -> Result<Self, GraphError> {
        toml::from_str(content).map_err(|e| GraphError::Config(e.to_string()))
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub graph_csv: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub batch_policy: Option<BatchPolicy>,
    pub csv_delimiter: Option<char>,
    pub csv_has_headers: bool,
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the redb store.
    pub data_dir: PathBuf,
    /// Bulk source loaded at startup instead of recovering.
    pub graph_csv: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    /// Error policy for `/follows` and `/unfollows`.
    pub batch_policy: BatchPolicy,
    /// How bulk sources are parsed.
    pub load: LoadOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            graph_csv: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            batch_policy: BatchPolicy::default(),
            load: LoadOptions::default(),
        }
    }
}

impl Config {
    /// Merge a config file with overrides, falling back to defaults.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, GraphError> {
        let defaults = Self::default();
        let delimiter = match overrides.csv_delimiter.or(file.csv_delimiter) {
            Some(c) => delimiter_byte(c)?,
            None => defaults.load.delimiter,
        };

        Ok(Self {
            data_dir: overrides
                .data_dir
                .or(file.data_dir)
                .unwrap_or(defaults.data_dir),
            graph_csv: overrides.graph_csv.or(file.graph_csv),
            host: overrides.host.or(file.host).unwrap_or(defaults.host),
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            batch_policy: overrides
                .batch_policy
                .or(file.batch_policy)
                .unwrap_or(defaults.batch_policy),
            load: LoadOptions {
                delimiter,
                has_headers: overrides.csv_has_headers
                    || file.csv_has_headers.unwrap_or(defaults.load.has_headers),
            },
        })
    }

    /// Resolve from an optional config file path.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, GraphError> {
        let file = match path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, overrides)
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// CSV delimiters must be a single ASCII byte.
pub fn delimiter_byte(c: char) -> Result<u8, GraphError> {
    if c.is_ascii() && c != '"' && c != '\n' && c != '\r' {
        Ok(c as u8)
    } else {
        Err(GraphError::Config(format!(
            "CSV delimiter {:?} must be a single ASCII character other than a quote or newline",
            c
        )))
    }
}

// =============================================================================
// TESTS
// =============================================================================
