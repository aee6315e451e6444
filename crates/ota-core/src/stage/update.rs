use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use ota_exec::PoolRunner;
use ota_model::{Envelope, Feedback, Request, Uid, WorkResult};
use ota_relay::{Connection, Connector, Target};
use serde_json::Value;
use tracing::{debug, error, info, instrument, trace, warn};

use super::{Received, Stage, StageContext, recv_within};
use crate::{
    error::CoreError,
    report::{self, ReportSink, UPDATE_REPORT, UpdateReport},
};

/// Detail-log directory for install feedback.
pub const DETAIL_STAGE: &str = "update_software";

/// Pushes the configured build to every approved controller and follows its progress.
pub struct Update {
    ctx: StageContext,
    runner: PoolRunner,
}

impl Update {
    pub fn new(ctx: StageContext) -> Result<Self, CoreError> {
        let runner = PoolRunner::new(ctx.config.max_pool_size)?;
        Ok(Self { ctx, runner })
    }
}

#[async_trait]
impl Stage for Update {
    type Input = Vec<Uid>;
    type Output = Vec<Uid>;

    fn name(&self) -> &'static str {
        "update"
    }

    #[instrument(level = "debug", skip_all, fields(stage = "update", approved = approved.len()))]
    async fn execute(&self, approved: Vec<Uid>) -> Result<Vec<Uid>, CoreError> {
        let console = &self.ctx.console;
        console.line("\nUpdate approved controllers:");

        let installer = Arc::new(Installer::new(&self.ctx));
        let mut results = self.runner.run(
            move |uid: Uid| {
                let installer = Arc::clone(&installer);
                async move { installer.install(uid).await }
            },
            approved,
        )?;

        let total = results.total();
        debug!(target: "ota.core.update", total, cap = self.runner.capacity(), "installing build");
        let (mut updated, mut failed) = (Vec::new(), Vec::new());
        // Results delivered around a worker fault are still classified and reported.
        let mut fault = None;
        loop {
            let result = match results.next().await {
                Ok(Some(result)) => result,
                Ok(None) => break,
                Err(e) => {
                    error!(target: "ota.core.update", error = %e, "installer faulted");
                    if fault.is_none() {
                        fault = Some(e);
                    }
                    continue;
                }
            };
            let verdict = if result.is_success() {
                console.green("UPDATED")
            } else if result.is_silent() {
                console.red("TIMEOUT")
            } else {
                console.red("FAILED")
            };
            console.line(format!("[{}/{total}] {} {verdict}", results.delivered(), result.uid));
            if result.is_success() {
                updated.push(result.uid);
            } else {
                failed.push(result.uid);
            }
        }

        info!(
            target: "ota.core.update",
            updated = updated.len(),
            failed = failed.len(),
            "update finished"
        );
        console.line(format!("{} controllers updated", updated.len()));
        report::persist(
            self.ctx.sink.as_ref(),
            UPDATE_REPORT,
            &UpdateReport::new(updated.clone(), failed),
        );
        if let Some(e) = fault {
            return Err(e.into());
        }
        Ok(updated)
    }
}

/// Per-controller worker: send the install command and follow updater feedback.
///
/// Every progress frame restarts the receive window. An `error` feedback fails the unit
/// with that payload; the relay closing the connection after at least one progress frame
/// completes it with the last progress payload.
pub(crate) struct Installer {
    connector: Arc<dyn Connector>,
    sink: Arc<dyn ReportSink>,
    detail: bool,
    window: Duration,
    build_url: String,
    token: String,
}

impl Installer {
    pub(crate) fn new(ctx: &StageContext) -> Self {
        Self {
            connector: Arc::clone(&ctx.connector),
            sink: Arc::clone(&ctx.sink),
            detail: ctx.config.report.detail_report,
            window: ctx.config.timeouts.update(),
            build_url: ctx.config.software_build_url.clone(),
            token: ctx.config.file_service_token.clone(),
        }
    }

    pub(crate) async fn install(&self, uid: Uid) -> WorkResult {
        let target = Target::admin(uid.clone()).with_client_id(format!("{uid}_worker"));
        let mut conn = match self.connector.connect(&target).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(target: "ota.core.update", %uid, error = %e, "connect failed");
                return WorkResult::silent(uid);
            }
        };
        let result = self.converse(uid, conn.as_mut()).await;
        if let Err(e) = conn.close().await {
            debug!(target: "ota.core.update", uid = %result.uid, error = %e, "close failed");
        }
        result
    }

    async fn converse(&self, uid: Uid, conn: &mut dyn Connection) -> WorkResult {
        let command = Request::update_software(uid.as_str(), &self.build_url, &self.token);
        if let Err(e) = conn.send(&command.to_value()).await {
            warn!(target: "ota.core.update", %uid, error = %e, "install command failed");
            return WorkResult::silent(uid);
        }

        let mut last_progress: Option<Value> = None;
        loop {
            let raw = match recv_within(conn, self.window).await {
                Received::Frame(raw) => raw,
                Received::TimedOut => {
                    warn!(target: "ota.core.update", %uid, window = ?self.window, "no update feedback in time");
                    return WorkResult::silent(uid);
                }
                Received::Closed => {
                    return match last_progress {
                        Some(progress) => {
                            info!(target: "ota.core.update", %uid, "relay closed after progress, install complete");
                            WorkResult::success(uid, progress)
                        }
                        None => {
                            warn!(target: "ota.core.update", %uid, "closed before any progress");
                            WorkResult::silent(uid)
                        }
                    };
                }
                Received::Failed(e) => {
                    warn!(target: "ota.core.update", %uid, error = %e, "receive failed");
                    return WorkResult::silent(uid);
                }
            };

            let envelope = match Envelope::parse(&raw) {
                Ok(envelope) if envelope.is_updater_feedback() => envelope,
                Ok(_) => continue,
                Err(e) => {
                    trace!(target: "ota.core.update", %uid, error = %e, "skipping non-json frame");
                    continue;
                }
            };
            if self.detail {
                report::detail(self.sink.as_ref(), DETAIL_STAGE, &uid, &raw);
            }
            match envelope.feedback() {
                Feedback::UpdateProgress => {
                    trace!(target: "ota.core.update", %uid, "progress");
                    last_progress = Some(envelope.into_body());
                }
                Feedback::Error => {
                    warn!(target: "ota.core.update", %uid, "controller reported an update error");
                    return WorkResult::failed(uid, envelope.into_body());
                }
                other => {
                    trace!(target: "ota.core.update", %uid, feedback = ?other, "ignored feedback");
                }
            }
        }
    }
}
