use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, expected text, json or journald")]
    InvalidFormat(String),

    #[error("invalid log filter directive {0:?}")]
    InvalidLevel(String),

    #[error("journald output requires linux and the `journald` feature")]
    JournaldUnavailable,

    #[error("a global logger is already installed")]
    AlreadyInitialized,

    #[error("failed to install logger: {0}")]
    Install(String),
}
