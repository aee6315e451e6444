use ota_model::{ControllerRecord, Reachability, Uid};
use serde::Serialize;

/// Reachability breakdown of the filtered roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub online: Vec<Uid>,
    pub inactive: Vec<Uid>,
    pub offline: Vec<Uid>,
    pub total_available: usize,
    pub total_unavailable: usize,
}

impl DiscoveryReport {
    pub fn classify(records: &[ControllerRecord]) -> Self {
        let mut report = Self::default();
        for c in records {
            let bucket = match c.reachability {
                Reachability::Online => &mut report.online,
                Reachability::Inactive => &mut report.inactive,
                Reachability::Offline => &mut report.offline,
            };
            bucket.push(c.uid.clone());
        }
        report.total_available = report.online.len() + report.inactive.len();
        report.total_unavailable = report.offline.len();
        report
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub approved_controllers: Vec<Uid>,
    pub rejected_controllers: Vec<Uid>,
    pub total_approved_controllers: usize,
    pub total_rejected_controllers: usize,
}

impl ValidationReport {
    pub fn new(approved: Vec<Uid>, rejected: Vec<Uid>) -> Self {
        Self {
            total_approved_controllers: approved.len(),
            total_rejected_controllers: rejected.len(),
            approved_controllers: approved,
            rejected_controllers: rejected,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub updated_controllers: Vec<Uid>,
    pub failed_controllers: Vec<Uid>,
    pub total_updated_controllers: usize,
    pub total_failed_controllers: usize,
}

impl UpdateReport {
    pub fn new(updated: Vec<Uid>, failed: Vec<Uid>) -> Self {
        Self {
            total_updated_controllers: updated.len(),
            total_failed_controllers: failed.len(),
            updated_controllers: updated,
            failed_controllers: failed,
        }
    }
}
