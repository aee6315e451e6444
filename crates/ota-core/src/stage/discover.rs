use async_trait::async_trait;
use ota_model::{ControllerRecord, Envelope, NULL_UID, Reachability, Request, Roster};
use ota_relay::{Connection, Target};
use tracing::{debug, info, instrument, trace, warn};

use super::{Received, Stage, StageContext, recv_within};
use crate::{
    error::CoreError,
    filter::FilterRules,
    report::{self, DISCOVERY_REPORT, DiscoveryReport},
};

/// Fetches the controller roster once and narrows it with the configured filters.
///
/// Output holds only available (online or inactive) controllers, in roster order.
pub struct Discover {
    ctx: StageContext,
    rules: FilterRules,
}

impl Discover {
    pub fn new(ctx: StageContext) -> Result<Self, CoreError> {
        let rules = ctx.config.filter_rules()?;
        Ok(Self { ctx, rules })
    }

    async fn fetch_roster(&self) -> Result<Vec<ControllerRecord>, CoreError> {
        let mut conn = self.ctx.connector.connect(&Target::admin(NULL_UID)).await?;
        let result = self.request_roster(conn.as_mut()).await;
        if let Err(e) = conn.close().await {
            debug!(target: "ota.core.discover", error = %e, "close failed");
        }
        result
    }

    async fn request_roster(
        &self,
        conn: &mut dyn Connection,
    ) -> Result<Vec<ControllerRecord>, CoreError> {
        conn.send(&Request::get_all_controllers().to_value()).await?;

        let window = self.ctx.config.timeouts.discovery();
        loop {
            let raw = match recv_within(conn, window).await {
                Received::Frame(raw) => raw,
                Received::TimedOut => return Err(CoreError::DiscoveryTimeout(window)),
                Received::Closed => return Err(CoreError::RosterClosed),
                Received::Failed(e) => return Err(e.into()),
            };
            match Envelope::parse(&raw) {
                Ok(envelope) if envelope.is_roster() => {
                    return Ok(Roster::from_envelope(envelope)?.controllers);
                }
                Ok(envelope) => {
                    trace!(target: "ota.core.discover", action = ?envelope.action, "skipping unrelated frame");
                }
                Err(e) => {
                    warn!(target: "ota.core.discover", error = %e, "skipping non-json frame");
                }
            }
        }
    }
}

#[async_trait]
impl Stage for Discover {
    type Input = ();
    type Output = Vec<ControllerRecord>;

    fn name(&self) -> &'static str {
        "discover"
    }

    #[instrument(level = "debug", skip_all, fields(stage = "discover"))]
    async fn execute(&self, _input: ()) -> Result<Vec<ControllerRecord>, CoreError> {
        let console = &self.ctx.console;
        console.line("\nRequest all connected controllers:");

        let roster = self.fetch_roster().await?;
        let reported = roster.len();
        let filtered = self.rules.apply(roster);

        let summary = DiscoveryReport::classify(&filtered);
        info!(
            target: "ota.core.discover",
            reported,
            kept = filtered.len(),
            available = summary.total_available,
            unavailable = summary.total_unavailable,
            "roster received"
        );
        for c in &filtered {
            let state = match c.reachability {
                Reachability::Online => console.green(c.reachability.as_str()),
                Reachability::Inactive => console.yellow(c.reachability.as_str()),
                Reachability::Offline => console.red(c.reachability.as_str()),
            };
            console.line(format!("{} {state}", c.uid));
        }
        console.line(format!(
            "{} controllers available, {} unavailable",
            summary.total_available, summary.total_unavailable
        ));
        report::persist(self.ctx.sink.as_ref(), DISCOVERY_REPORT, &summary);

        Ok(filtered.into_iter().filter(ControllerRecord::is_available).collect())
    }
}
