use serde::Serialize;

use crate::{NULL_UID, Uid};

/// Command issued by the updater service on behalf of an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdaterCommand {
    GetAllVersions,
    UpdateSoftware,
}

/// Outbound message sent to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Enumerate every controller known to the relay.
    GetAllControllers { uid: Uid },
    /// Route feedback of a controller to this connection.
    AdminSubscribe { uid: Uid },
    UpdaterCommand {
        command: UpdaterCommand,
        uid: Uid,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

impl Request {
    pub fn get_all_controllers() -> Self {
        Request::GetAllControllers {
            uid: NULL_UID.to_string(),
        }
    }

    pub fn admin_subscribe(uid: impl Into<Uid>) -> Self {
        Request::AdminSubscribe { uid: uid.into() }
    }

    pub fn get_all_versions(uid: impl Into<Uid>) -> Self {
        Request::UpdaterCommand {
            command: UpdaterCommand::GetAllVersions,
            uid: uid.into(),
            url: None,
            token: None,
        }
    }

    /// Install command carrying the build artifact and the file-service token.
    pub fn update_software(
        uid: impl Into<Uid>,
        url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Request::UpdaterCommand {
            command: UpdaterCommand::UpdateSoftware,
            uid: uid.into(),
            url: Some(url.into()),
            token: Some(token.into()),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Only string fields; serialisation cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
