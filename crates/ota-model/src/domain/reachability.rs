use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Reachability of a controller as reported by the relay roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    /// Connected and responsive.
    Online,
    /// Connected but currently not responsive.
    Inactive,
    /// Not connected to the relay.
    Offline,
}

impl Reachability {
    /// Returns `true` if the controller can be contacted by later stages.
    pub fn is_available(&self) -> bool {
        matches!(self, Reachability::Online | Reachability::Inactive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Reachability::Online => "online",
            Reachability::Inactive => "inactive",
            Reachability::Offline => "offline",
        }
    }

    /// Maps a relay status string; anything unrecognised counts as offline.
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "online" => Reachability::Online,
            "inactive" => Reachability::Inactive,
            _ => Reachability::Offline,
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Reachability {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Reachability::from_status(&raw))
    }
}
