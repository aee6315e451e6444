use serde::{Deserialize, Serialize};

use crate::{Reachability, Uid};

/// One fleet member as last observed by discovery.
///
/// Records are rebuilt from every roster response and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerRecord {
    pub uid: Uid,
    #[serde(rename = "status")]
    pub reachability: Reachability,
}

impl ControllerRecord {
    pub fn new(uid: impl Into<Uid>, reachability: Reachability) -> Self {
        Self {
            uid: uid.into(),
            reachability,
        }
    }

    /// Placeholder for a requested controller that never reported in.
    pub fn offline(uid: impl Into<Uid>) -> Self {
        Self::new(uid, Reachability::Offline)
    }

    pub fn is_available(&self) -> bool {
        self.reachability.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_roster_entry() {
        let rec: ControllerRecord =
            serde_json::from_str(r#"{"uid":"ctl-1","status":"inactive"}"#).unwrap();
        assert_eq!(rec, ControllerRecord::new("ctl-1", Reachability::Inactive));
        assert!(rec.is_available());
    }

    #[test]
    fn offline_placeholder() {
        let rec = ControllerRecord::offline("ghost");
        assert_eq!(rec.reachability, Reachability::Offline);
        assert!(!rec.is_available());
    }
}
