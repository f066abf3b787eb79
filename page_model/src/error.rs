//! Error types for page configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid site config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("consent retention of {days} days is outside 1..=400")]
    InvalidRetention { days: i64 },
}
