use std::time::Duration;

use ota_exec::ExecError;
use ota_model::ModelError;
use ota_relay::RelayError;
use thiserror::Error;

use crate::{config::ConfigError, report::ReportError};

/// Stage-fatal failures. Per-controller failures never surface here; they are
/// folded into `WorkResult` outcomes by the workers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("no roster response within {0:?}")]
    DiscoveryTimeout(Duration),

    #[error("relay closed the discovery connection before sending the roster")]
    RosterClosed,

    #[error("malformed roster response: {0}")]
    MalformedRoster(#[from] ModelError),

    #[error("task runner error: {0}")]
    Exec(#[from] ExecError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("report error: {0}")]
    Report(#[from] ReportError),
}
