//! Stage reports and per-controller detail logs.
mod error;
pub use error::ReportError;

mod fs;
pub use fs::FsReportSink;

mod records;
pub use records::{DiscoveryReport, UpdateReport, ValidationReport};

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

pub const DISCOVERY_REPORT: &str = "controllers_states.yaml";
pub const VALIDATION_REPORT: &str = "validation_result.yaml";
pub const UPDATE_REPORT: &str = "update_result.yaml";

/// Destination for stage reports and raw controller traffic.
///
/// Implementations must tolerate concurrent `append_detail` calls for distinct uids.
pub trait ReportSink: Send + Sync {
    /// Appends a YAML document named `name` (must end in `.yaml`).
    fn persist(&self, name: &str, record: &Value) -> Result<(), ReportError>;

    /// Appends one timestamped line to the detail log of `uid` under `stage`.
    fn append_detail(&self, stage: &str, uid: &str, line: &str) -> Result<(), ReportError>;
}

/// Persists a stage report; failures are logged and never abort the stage.
pub(crate) fn persist<R: Serialize>(sink: &dyn ReportSink, name: &str, record: &R) {
    let result = serde_json::to_value(record)
        .map_err(ReportError::from)
        .and_then(|value| sink.persist(name, &value));
    if let Err(e) = result {
        warn!(target: "ota.core.report", report = name, error = %e, "failed to persist report");
    }
}

pub(crate) fn detail(sink: &dyn ReportSink, stage: &str, uid: &str, line: &str) {
    if let Err(e) = sink.append_detail(stage, uid, line) {
        warn!(target: "ota.core.report", stage, uid, error = %e, "failed to write detail log");
    }
}
