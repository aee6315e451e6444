use std::collections::{BTreeSet, HashSet};

use ota_model::{ControllerRecord, Uid};
use regex::Regex;

/// Roster filter applied by discovery.
///
/// A non-empty whitelist takes precedence over the blacklist: only listed uids are kept and
/// listed uids the relay did not report are added as offline records, in sorted order after
/// the reported ones. Otherwise blacklisted uids are dropped. The uid pattern, when set,
/// must match the whole uid and is applied last.
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    whitelist: BTreeSet<Uid>,
    blacklist: BTreeSet<Uid>,
    uid_pattern: Option<Regex>,
}

impl FilterRules {
    pub fn new(
        whitelist: BTreeSet<Uid>,
        blacklist: BTreeSet<Uid>,
        uid_pattern: Option<&str>,
    ) -> Result<Self, regex::Error> {
        let uid_pattern = uid_pattern
            .map(|p| Regex::new(&format!("^(?:{p})$")))
            .transpose()?;
        Ok(Self {
            whitelist,
            blacklist,
            uid_pattern,
        })
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn apply(&self, roster: Vec<ControllerRecord>) -> Vec<ControllerRecord> {
        let mut kept: Vec<ControllerRecord> = if self.whitelist.is_empty() {
            roster
                .into_iter()
                .filter(|c| !self.blacklist.contains(&c.uid))
                .collect()
        } else {
            let reported: HashSet<&str> = roster.iter().map(|c| c.uid.as_str()).collect();
            let missing: Vec<ControllerRecord> = self
                .whitelist
                .iter()
                .filter(|uid| !reported.contains(uid.as_str()))
                .map(ControllerRecord::offline)
                .collect();
            roster
                .into_iter()
                .filter(|c| self.whitelist.contains(&c.uid))
                .chain(missing)
                .collect()
        };

        if let Some(pattern) = &self.uid_pattern {
            kept.retain(|c| pattern.is_match(&c.uid));
        }
        kept
    }
}
