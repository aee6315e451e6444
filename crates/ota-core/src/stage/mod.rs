//! Campaign stages.
//!
//! ```text
//! Discover ──► Vec<ControllerRecord> ──► Validate ──► Validation ──► Update ──► Vec<Uid>
//! ```
//!
//! Each stage owns its [`PoolRunner`](ota_exec::PoolRunner) and opens one relay connection
//! per controller. Per-controller failures become `WorkResult` errors; only relay-wide
//! failures and worker faults abort a stage.
mod discover;
pub use discover::Discover;

mod validate;
pub use validate::{DETAIL_STAGE as VALIDATION_DETAIL_STAGE, Validate, Validation};

mod update;
pub use update::{DETAIL_STAGE as UPDATE_DETAIL_STAGE, Update};

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use ota_observe::Console;
use ota_relay::{Connection, Connector, RelayError};
use tokio::time::timeout;

use crate::{config::CampaignConfig, error::CoreError, report::ReportSink};

/// One step of the campaign pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn name(&self) -> &'static str;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output, CoreError>;
}

/// Collaborators shared by every stage of a run.
#[derive(Clone)]
pub struct StageContext {
    pub connector: Arc<dyn Connector>,
    pub sink: Arc<dyn ReportSink>,
    pub console: Console,
    pub config: Arc<CampaignConfig>,
}

impl StageContext {
    pub fn new(
        connector: Arc<dyn Connector>,
        sink: Arc<dyn ReportSink>,
        console: Console,
        config: CampaignConfig,
    ) -> Self {
        Self {
            connector,
            sink,
            console,
            config: Arc::new(config),
        }
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("console", &self.console)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// What a single bounded receive produced.
pub(crate) enum Received {
    Frame(String),
    TimedOut,
    Closed,
    Failed(RelayError),
}

/// Waits at most `window` for the next frame.
pub(crate) async fn recv_within(conn: &mut dyn Connection, window: Duration) -> Received {
    match timeout(window, conn.recv()).await {
        Err(_) => Received::TimedOut,
        Ok(Ok(Some(raw))) => Received::Frame(raw),
        Ok(Ok(None)) => Received::Closed,
        Ok(Err(e)) => Received::Failed(e),
    }
}
