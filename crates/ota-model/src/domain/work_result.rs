use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Uid;

/// Outcome of one unit of work against a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Error,
}

/// Result produced exactly once per unit of work and consumed by a stage aggregator.
///
/// An `Error` without payload means the controller went silent (timeout or lost connection);
/// an `Error` with payload carries the feedback message the controller reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkResult {
    pub uid: Uid,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl WorkResult {
    pub fn success(uid: impl Into<Uid>, payload: Value) -> Self {
        Self {
            uid: uid.into(),
            outcome: Outcome::Success,
            payload: Some(payload),
        }
    }

    pub fn failed(uid: impl Into<Uid>, payload: Value) -> Self {
        Self {
            uid: uid.into(),
            outcome: Outcome::Error,
            payload: Some(payload),
        }
    }

    pub fn silent(uid: impl Into<Uid>) -> Self {
        Self {
            uid: uid.into(),
            outcome: Outcome::Error,
            payload: None,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// `true` for an error the controller never explained.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.outcome == Outcome::Error && self.payload.is_none()
    }
}
