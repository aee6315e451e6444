mod cli;
mod gate;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use ota_core::{
    AutoConfirm, Campaign, CampaignConfig, CampaignOutcome, ConfirmGate, FsReportSink, Halt,
    StageContext,
};
use ota_observe::{Console, LoggerConfig, LoggerLevel, init_logger};
use ota_relay::WsConnector;

use crate::{cli::Cli, gate::StdinConfirm};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1) Logger
    let logger = LoggerConfig {
        format: cli.log_format,
        level: LoggerLevel::new(cli.log_level.as_str())?,
        ..Default::default()
    };
    init_logger(&logger)?;

    // 2) Configuration
    let config = CampaignConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?
        .with_build_url(cli.build_url.clone());
    config.validate().context("invalid configuration")?;
    info!(config = %cli.config.display(), "configuration loaded");

    let console = Console::detect();
    console.line(format!("{config:#?}"));

    // 3) Collaborators
    let sink = FsReportSink::create(&config.report).context("failed to create report directory")?;
    console.line(format!("Reports: {}", sink.dir().display()));
    let connector = WsConnector::new(config.relay.clone());
    let gate: Box<dyn ConfirmGate> = if cli.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(StdinConfirm::new(console))
    };

    let ctx = StageContext::new(Arc::new(connector), Arc::new(sink), console, config);
    let campaign = Campaign::new(ctx, gate)?;

    // 4) Run until done or interrupted
    tokio::select! {
        outcome = campaign.run() => {
            let outcome = outcome.context("campaign aborted")?;
            summarize(&console, &outcome);
            Ok(())
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            warn!("interrupted by operator");
            console.line(console.red("\nInterrupted"));
            anyhow::bail!("interrupted")
        }
    }
}

fn summarize(console: &Console, outcome: &CampaignOutcome) {
    match outcome.halted {
        Some(Halt::NothingAvailable) => console.line("Finished: no available controllers"),
        Some(Halt::NothingApproved) => console.line("Finished: no controllers passed validation"),
        Some(Halt::Declined) => console.line("Finished: update cancelled by operator"),
        None => {
            let line = format!(
                "Finished: {}/{} controllers updated",
                outcome.updated.len(),
                outcome.approved.len()
            );
            if outcome.is_complete() {
                console.line(console.green(&line));
            } else {
                console.line(console.yellow(&line));
            }
        }
    }
}
