use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use ota_exec::PoolRunner;
use ota_model::{ControllerRecord, Envelope, Feedback, Request, Uid, WorkResult};
use ota_relay::{Connection, Connector, Target};
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use super::{Received, Stage, StageContext, recv_within};
use crate::{
    error::CoreError,
    report::{self, ReportSink, VALIDATION_REPORT, ValidationReport},
};

/// Detail-log directory for version queries.
pub const DETAIL_STAGE: &str = "get_controller_version";

/// Result of the validation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Validation is disabled; every available controller proceeds.
    Skipped,
    /// Controllers that answered the version query, in completion order.
    Completed(Vec<Uid>),
}

/// Approves controllers that report their software versions within the validation window.
pub struct Validate {
    ctx: StageContext,
    runner: PoolRunner,
}

impl Validate {
    pub fn new(ctx: StageContext) -> Result<Self, CoreError> {
        let runner = PoolRunner::new(ctx.config.max_pool_size)?;
        Ok(Self { ctx, runner })
    }
}

#[async_trait]
impl Stage for Validate {
    type Input = Vec<ControllerRecord>;
    type Output = Validation;

    fn name(&self) -> &'static str {
        "validate"
    }

    #[instrument(level = "debug", skip_all, fields(stage = "validate", candidates = candidates.len()))]
    async fn execute(&self, candidates: Vec<ControllerRecord>) -> Result<Validation, CoreError> {
        let console = &self.ctx.console;
        if !self.ctx.config.validate_controllers {
            info!(target: "ota.core.validate", "validation disabled");
            console.line(console.yellow("\nSkip controllers validation"));
            return Ok(Validation::Skipped);
        }
        console.line("\nValidate connected controllers:");

        let uids: Vec<Uid> = candidates
            .into_iter()
            .filter(ControllerRecord::is_available)
            .map(|c| c.uid)
            .collect();

        let check = Arc::new(VersionCheck::new(&self.ctx));
        let mut results = self.runner.run(
            move |uid: Uid| {
                let check = Arc::clone(&check);
                async move { check.query(uid).await }
            },
            uids,
        )?;

        let total = results.total();
        debug!(target: "ota.core.validate", total, cap = self.runner.capacity(), "querying versions");
        let (mut approved, mut rejected) = (Vec::new(), Vec::new());
        // Results delivered around a worker fault are still classified and reported.
        let mut fault = None;
        loop {
            let result = match results.next().await {
                Ok(Some(result)) => result,
                Ok(None) => break,
                Err(e) => {
                    error!(target: "ota.core.validate", error = %e, "version check faulted");
                    if fault.is_none() {
                        fault = Some(e);
                    }
                    continue;
                }
            };
            let verdict = if result.is_success() {
                console.green("APPROVED")
            } else {
                console.red("REJECTED")
            };
            console.line(format!("[{}/{total}] {} {verdict}", results.delivered(), result.uid));
            if result.is_success() {
                approved.push(result.uid);
            } else {
                rejected.push(result.uid);
            }
        }

        info!(
            target: "ota.core.validate",
            approved = approved.len(),
            rejected = rejected.len(),
            "validation finished"
        );
        console.line(format!("{} controllers approved", approved.len()));
        report::persist(
            self.ctx.sink.as_ref(),
            VALIDATION_REPORT,
            &ValidationReport::new(approved.clone(), rejected),
        );
        if let Some(e) = fault {
            return Err(e.into());
        }
        Ok(Validation::Completed(approved))
    }
}

/// Per-controller worker: subscribe, ask for versions, wait for the answer.
pub(crate) struct VersionCheck {
    connector: Arc<dyn Connector>,
    sink: Arc<dyn ReportSink>,
    detail: bool,
    window: Duration,
    settle: Duration,
}

impl VersionCheck {
    pub(crate) fn new(ctx: &StageContext) -> Self {
        Self {
            connector: Arc::clone(&ctx.connector),
            sink: Arc::clone(&ctx.sink),
            detail: ctx.config.report.detail_report,
            window: ctx.config.timeouts.validation(),
            settle: ctx.config.timeouts.subscribe_delay(),
        }
    }

    pub(crate) async fn query(&self, uid: Uid) -> WorkResult {
        let target =
            Target::admin(uid.clone()).with_client_id(format!("{uid}_worker_{}", Uuid::new_v4()));
        let mut conn = match self.connector.connect(&target).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(target: "ota.core.validate", %uid, error = %e, "connect failed");
                return WorkResult::silent(uid);
            }
        };
        let result = self.converse(uid, conn.as_mut()).await;
        if let Err(e) = conn.close().await {
            debug!(target: "ota.core.validate", uid = %result.uid, error = %e, "close failed");
        }
        result
    }

    async fn converse(&self, uid: Uid, conn: &mut dyn Connection) -> WorkResult {
        if let Err(e) = conn.send(&Request::admin_subscribe(uid.as_str()).to_value()).await {
            warn!(target: "ota.core.validate", %uid, error = %e, "subscribe failed");
            return WorkResult::silent(uid);
        }
        tokio::time::sleep(self.settle).await;
        if let Err(e) = conn.send(&Request::get_all_versions(uid.as_str()).to_value()).await {
            warn!(target: "ota.core.validate", %uid, error = %e, "version request failed");
            return WorkResult::silent(uid);
        }

        loop {
            let raw = match recv_within(conn, self.window).await {
                Received::Frame(raw) => raw,
                Received::TimedOut => {
                    debug!(target: "ota.core.validate", %uid, window = ?self.window, "no versions in time");
                    return WorkResult::silent(uid);
                }
                Received::Closed => {
                    debug!(target: "ota.core.validate", %uid, "closed before versions arrived");
                    return WorkResult::silent(uid);
                }
                Received::Failed(e) => {
                    warn!(target: "ota.core.validate", %uid, error = %e, "receive failed");
                    return WorkResult::silent(uid);
                }
            };
            if self.detail {
                report::detail(self.sink.as_ref(), DETAIL_STAGE, &uid, &raw);
            }
            match Envelope::parse(&raw) {
                Ok(envelope) if envelope.feedback() == Feedback::AllSoftwareVersions => {
                    trace!(target: "ota.core.validate", %uid, "versions received");
                    return WorkResult::success(uid, envelope.into_body());
                }
                Ok(_) => continue,
                Err(e) => {
                    trace!(target: "ota.core.validate", %uid, error = %e, "skipping non-json frame");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ota_model::Reachability;
    use serde_json::json;

    use crate::testing::{FakeConnector, MemorySink, Step, config, context, versions_frame};

    fn online(uids: &[&str]) -> Vec<ControllerRecord> {
        uids.iter()
            .map(|u| ControllerRecord::new(*u, Reachability::Online))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn approves_answering_controllers_and_rejects_silent_ones() {
        let connector = FakeConnector::new()
            .script(
                "c1",
                vec![
                    Step::frame(Duration::from_millis(50), json!({"action": "pong"})),
                    Step::frame(Duration::from_millis(50), versions_frame("c1")),
                ],
            )
            .shared();
        let sink = MemorySink::new();
        let stage = Validate::new(context(&connector, &sink, config())).unwrap();

        let out = stage.execute(online(&["c1", "c2"])).await.unwrap();
        assert_eq!(out, Validation::Completed(vec!["c1".to_string()]));

        assert_eq!(
            connector.sent_to("c1"),
            vec![
                json!({"action": "admin_subscribe", "uid": "c1"}),
                json!({"action": "updater_command", "command": "get_all_versions", "uid": "c1"}),
            ]
        );
        let client_ids: Vec<String> = connector
            .targets()
            .iter()
            .filter(|t| t.uid == "c1")
            .flat_map(|t| t.params.iter())
            .filter(|(k, _)| k == "client_id")
            .map(|(_, v)| v.clone())
            .collect();
        assert_eq!(client_ids.len(), 1);
        assert!(client_ids[0].starts_with("c1_worker_"));

        assert_eq!(sink.details(DETAIL_STAGE, "c1").len(), 2);

        let report = sink.record(VALIDATION_REPORT).unwrap();
        assert_eq!(report["approved_controllers"], json!(["c1"]));
        assert_eq!(report["rejected_controllers"], json!(["c2"]));
        assert_eq!(report["total_rejected_controllers"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn version_query_times_out_after_window() {
        let connector = FakeConnector::new()
            .script(
                "late",
                vec![Step::frame(Duration::from_secs(11), versions_frame("late"))],
            )
            .shared();
        let sink = MemorySink::new();
        let check = VersionCheck::new(&context(&connector, &sink, config()));

        let started = tokio::time::Instant::now();
        let result = check.query("late".into()).await;
        assert!(result.is_silent());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(10_200), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(11_200), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn window_restarts_after_each_frame() {
        let connector = FakeConnector::new()
            .script(
                "c1",
                vec![
                    Step::frame(Duration::from_secs(8), json!({"action": "pong"})),
                    Step::frame(Duration::from_secs(8), versions_frame("c1")),
                ],
            )
            .shared();
        let sink = MemorySink::new();
        let check = VersionCheck::new(&context(&connector, &sink, config()));

        let result = check.query("c1".into()).await;
        assert!(result.is_success());
        assert_eq!(result.payload.unwrap()["versions"]["firmware"], "1.2.3");
    }

    #[tokio::test(start_paused = true)]
    async fn refused_or_closed_connections_are_rejected() {
        let connector = FakeConnector::new()
            .refuse("gone")
            .script("flaky", vec![Step::close(Duration::from_millis(10))])
            .script("broken", vec![Step::fail(Duration::from_millis(10))])
            .shared();
        let sink = MemorySink::new();
        let stage = Validate::new(context(&connector, &sink, config())).unwrap();

        let out = stage.execute(online(&["gone", "flaky", "broken"])).await.unwrap();
        assert_eq!(out, Validation::Completed(Vec::new()));
        let report = sink.record(VALIDATION_REPORT).unwrap();
        assert_eq!(report["total_rejected_controllers"], 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fault_keeps_already_classified_controllers_in_report() {
        let connector = FakeConnector::new()
            .script("c1", vec![Step::frame(Duration::from_millis(10), versions_frame("c1"))])
            .script("boom", vec![Step::panic(Duration::from_secs(1), "validator bug")])
            .shared();
        let sink = MemorySink::new();
        let stage = Validate::new(context(&connector, &sink, config())).unwrap();

        let err = stage
            .execute(online(&["c1", "boom", "c3"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Exec(ota_exec::ExecError::WorkerFault(ref reason)) if reason == "validator bug"
        ));

        let report = sink.record(VALIDATION_REPORT).unwrap();
        assert_eq!(report["approved_controllers"], json!(["c1"]));
        assert_eq!(report["rejected_controllers"], json!(["c3"]));
    }

    #[tokio::test]
    async fn disabled_validation_opens_no_connections() {
        let connector = FakeConnector::new().shared();
        let sink = MemorySink::new();
        let mut cfg = config();
        cfg.validate_controllers = false;
        let stage = Validate::new(context(&connector, &sink, cfg)).unwrap();

        assert_eq!(
            stage.execute(online(&["c1"])).await.unwrap(),
            Validation::Skipped
        );
        assert_eq!(connector.connects(), 0);
        assert!(sink.record(VALIDATION_REPORT).is_none());
    }

    #[tokio::test]
    async fn empty_input_opens_no_connections() {
        let connector = FakeConnector::new().shared();
        let sink = MemorySink::new();
        let stage = Validate::new(context(&connector, &sink, config())).unwrap();

        assert_eq!(
            stage.execute(Vec::new()).await.unwrap(),
            Validation::Completed(Vec::new())
        );
        assert_eq!(connector.connects(), 0);
        let report = sink.record(VALIDATION_REPORT).unwrap();
        assert_eq!(report["total_approved_controllers"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn detail_log_can_be_disabled() {
        let connector = FakeConnector::new()
            .script("c1", vec![Step::frame(Duration::ZERO, versions_frame("c1"))])
            .shared();
        let sink = MemorySink::new();
        let mut cfg = config();
        cfg.report.detail_report = false;
        let stage = Validate::new(context(&connector, &sink, cfg)).unwrap();

        stage.execute(online(&["c1"])).await.unwrap();
        assert!(sink.details(DETAIL_STAGE, "c1").is_empty());
    }
}
