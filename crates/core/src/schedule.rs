use crate::pipeline::Pipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Periodically refreshes `symbols`. The first run happens one `period` after
/// spawning. A tick that finds a refresh already in progress is skipped.
pub fn spawn_refresh_schedule(
    pipeline: Arc<Pipeline>,
    symbols: Vec<String>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            period_secs = period.as_secs(),
            symbols = symbols.len(),
            "refresh schedule started"
        );

        loop {
            ticker.tick().await;
            match pipeline.try_refresh_all(&symbols).await {
                Some(results) => tracing::info!(
                    target: "schedule",
                    refreshed = results.len(),
                    requested = symbols.len(),
                    "scheduled refresh tick"
                ),
                None => tracing::warn!(
                    target: "schedule",
                    "refresh already in progress; skipping scheduled tick"
                ),
            }
        }
    })
}
