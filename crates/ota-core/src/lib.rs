pub mod error;
pub use error::CoreError;

pub mod config;
pub use config::{CampaignConfig, ConfigError, ReportConfig, StageTimeouts};

pub mod filter;
pub use filter::FilterRules;

pub mod report;
pub use report::{FsReportSink, ReportError, ReportSink};

pub mod stage;
pub use stage::{Discover, Stage, StageContext, Update, Validate, Validation};

pub mod campaign;
pub use campaign::{AutoConfirm, Campaign, CampaignOutcome, ConfirmGate, Halt};

#[cfg(test)]
pub(crate) mod testing;
