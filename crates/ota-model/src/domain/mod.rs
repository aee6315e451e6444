mod reachability;
pub use reachability::Reachability;

mod controller;
pub use controller::ControllerRecord;

mod work_result;
pub use work_result::{Outcome, WorkResult};

/// Stable unique identifier of a fleet controller.
pub type Uid = String;

/// Uid the relay expects on connections that are not bound to a single controller.
pub const NULL_UID: &str = "null";
