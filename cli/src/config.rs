//! On-disk configuration for a reasoning session, loaded from an optional
//! TOML file and overridable from the command line.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Per-KB assertion capacity before the eviction heap kicks in.
    pub kb_capacity: usize,
    /// Default `max_depth` for backward-chaining queries that don't name one.
    pub backward_depth: u32,
    /// Log level passed to `tracing_subscriber`'s `EnvFilter` when `RUST_LOG`
    /// is unset.
    pub log_level: String,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            kb_capacity: 10_000,
            backward_depth: kif_reasoner::DEFAULT_BACKWARD_DEPTH,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl ReasonerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
