//! Relay wire contract.
//!
//! Outbound commands are typed [`Request`]s; inbound frames are inspected through
//! an [`Envelope`] which keeps the raw JSON body for reporting.

mod request;
pub use request::{Request, UpdaterCommand};

mod inbound;
pub use inbound::{Envelope, Feedback, Roster};

pub const ACTION_GET_ALL_CONTROLLERS: &str = "get_all_controllers";
pub const ACTION_UPDATER_FEEDBACK: &str = "updater_feedback";

pub const FEEDBACK_ALL_SOFTWARE_VERSIONS: &str = "all_software_versions";
pub const FEEDBACK_UPDATE_PROGRESS: &str = "update_progress";
pub const FEEDBACK_ERROR: &str = "error";
