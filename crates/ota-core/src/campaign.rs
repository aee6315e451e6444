//! Sequential Discover → Validate → Update pipeline.
use async_trait::async_trait;
use ota_model::{ControllerRecord, Uid};
use tracing::{error, info, instrument};

use crate::{
    error::CoreError,
    stage::{Discover, Stage, StageContext, Update, Validate, Validation},
};

/// Last chance to stop before the destructive stage.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    /// Returns `true` to proceed with updating `approved`.
    async fn confirm(&self, approved: &[Uid]) -> bool;
}

/// Gate that always proceeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl ConfirmGate for AutoConfirm {
    async fn confirm(&self, _approved: &[Uid]) -> bool {
        true
    }
}

/// Why a campaign ended before the update stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    NothingAvailable,
    NothingApproved,
    Declined,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignOutcome {
    pub available: Vec<Uid>,
    pub validation_skipped: bool,
    pub approved: Vec<Uid>,
    pub updated: Vec<Uid>,
    pub halted: Option<Halt>,
}

pub struct Campaign {
    ctx: StageContext,
    discover: Discover,
    validate: Validate,
    update: Update,
    gate: Box<dyn ConfirmGate>,
}

impl Campaign {
    pub fn new(ctx: StageContext, gate: Box<dyn ConfirmGate>) -> Result<Self, CoreError> {
        Ok(Self {
            discover: Discover::new(ctx.clone())?,
            validate: Validate::new(ctx.clone())?,
            update: Update::new(ctx.clone())?,
            ctx,
            gate,
        })
    }

    /// Runs every stage in order. Stage-fatal errors abort the run.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> Result<CampaignOutcome, CoreError> {
        let console = &self.ctx.console;
        let available: Vec<ControllerRecord> = run_stage(&self.discover, ()).await?;
        let mut outcome = CampaignOutcome {
            available: available.iter().map(|c| c.uid.clone()).collect(),
            ..CampaignOutcome::default()
        };
        if available.is_empty() {
            console.line(console.yellow("No available controllers, nothing to update"));
            return Ok(outcome.halt(Halt::NothingAvailable));
        }

        outcome.approved = match run_stage(&self.validate, available).await? {
            Validation::Skipped => {
                outcome.validation_skipped = true;
                outcome.available.clone()
            }
            Validation::Completed(approved) => approved,
        };
        if outcome.approved.is_empty() {
            console.line(console.yellow("No approved controllers, nothing to update"));
            return Ok(outcome.halt(Halt::NothingApproved));
        }

        if !self.gate.confirm(&outcome.approved).await {
            console.line(console.yellow("Update cancelled"));
            return Ok(outcome.halt(Halt::Declined));
        }

        outcome.updated = run_stage(&self.update, outcome.approved.clone()).await?;
        info!(
            target: "ota.core.campaign",
            available = outcome.available.len(),
            approved = outcome.approved.len(),
            updated = outcome.updated.len(),
            "campaign finished"
        );
        Ok(outcome)
    }
}

async fn run_stage<S: Stage>(stage: &S, input: S::Input) -> Result<S::Output, CoreError> {
    info!(target: "ota.core.campaign", stage = stage.name(), "stage started");
    let output = stage.execute(input).await;
    match &output {
        Ok(_) => info!(target: "ota.core.campaign", stage = stage.name(), "stage finished"),
        Err(e) => error!(target: "ota.core.campaign", stage = stage.name(), error = %e, "stage failed"),
    }
    output
}

impl CampaignOutcome {
    fn halt(mut self, reason: Halt) -> Self {
        info!(target: "ota.core.campaign", ?reason, "campaign halted before update");
        self.halted = Some(reason);
        self
    }

    /// `true` when every approved controller was updated.
    pub fn is_complete(&self) -> bool {
        self.halted.is_none() && self.updated.len() == self.approved.len()
    }
}
