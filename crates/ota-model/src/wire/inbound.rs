use serde::Deserialize;
use serde_json::Value;

use super::{
    ACTION_GET_ALL_CONTROLLERS, ACTION_UPDATER_FEEDBACK, FEEDBACK_ALL_SOFTWARE_VERSIONS,
    FEEDBACK_ERROR, FEEDBACK_UPDATE_PROGRESS,
};
use crate::{ControllerRecord, ModelError};

/// Kind of asynchronous feedback a controller sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    AllSoftwareVersions,
    UpdateProgress,
    Error,
    Other(String),
    /// Frame carries no `feedback_type`.
    Absent,
}

/// Parsed inbound frame.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub action: Option<String>,
    pub feedback_type: Option<String>,
    pub body: Value,
}

impl Envelope {
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let body: Value = serde_json::from_str(raw)?;
        let field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_owned);

        Ok(Self {
            action: field("action"),
            feedback_type: field("feedback_type"),
            body,
        })
    }

    #[inline]
    pub fn is_action(&self, action: &str) -> bool {
        self.action.as_deref() == Some(action)
    }

    #[inline]
    pub fn is_roster(&self) -> bool {
        self.is_action(ACTION_GET_ALL_CONTROLLERS)
    }

    #[inline]
    pub fn is_updater_feedback(&self) -> bool {
        self.is_action(ACTION_UPDATER_FEEDBACK)
    }

    pub fn feedback(&self) -> Feedback {
        match self.feedback_type.as_deref() {
            Some(FEEDBACK_ALL_SOFTWARE_VERSIONS) => Feedback::AllSoftwareVersions,
            Some(FEEDBACK_UPDATE_PROGRESS) => Feedback::UpdateProgress,
            Some(FEEDBACK_ERROR) => Feedback::Error,
            Some(other) => Feedback::Other(other.to_string()),
            None => Feedback::Absent,
        }
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

/// Body of a `get_all_controllers` response.
#[derive(Debug, Clone, Deserialize)]
pub struct Roster {
    pub controllers: Vec<ControllerRecord>,
}

impl Roster {
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ModelError> {
        Ok(serde_json::from_value(envelope.into_body())?)
    }
}
