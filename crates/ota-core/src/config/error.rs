use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file is empty")]
    Empty,

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid relay url: {0}")]
    InvalidRelayUrl(String),

    #[error("software_build_url is required (config or -u/--build-url)")]
    MissingBuildUrl,

    #[error("file_service_token is required")]
    MissingToken,

    #[error("max_pool_size must be greater than zero")]
    InvalidPoolSize,

    #[error("timeout {0} must be greater than zero")]
    InvalidTimeout(&'static str),

    #[error("invalid controller_uid_regex: {0}")]
    InvalidRegex(#[source] Box<regex::Error>),
}
