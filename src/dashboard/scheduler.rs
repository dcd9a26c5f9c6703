//! Periodic dashboard ticks
//!
//! Two independent timers: a slow sync tick (online check, dial
//! breathing, flow index) and a fast beam tick. Both fire once right away.
//! Ticks missed while the process was suspended are skipped rather than
//! replayed.

use super::Dashboard;
use crate::config::ScheduleConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Tick periods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickIntervals {
    pub sync: Duration,
    pub beam: Duration,
}

impl From<&ScheduleConfig> for TickIntervals {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            sync: Duration::from_secs(config.sync_interval_secs.max(1)),
            beam: Duration::from_secs(config.beam_interval_secs.max(1)),
        }
    }
}

/// Run the ticks until `shutdown` is cancelled
pub fn spawn(
    dashboard: Arc<Dashboard>,
    intervals: TickIntervals,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sync = tokio::time::interval(intervals.sync);
        sync.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut beam = tokio::time::interval(intervals.beam);
        beam.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            sync_secs = intervals.sync.as_secs_f64(),
            beam_secs = intervals.beam.as_secs_f64(),
            "Dashboard ticks started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sync.tick() => {
                    let report = dashboard.sync_tick().await;
                    tracing::debug!(
                        online = report.online,
                        flow_index = report.flow_index,
                        rc = report.dials.rc,
                        ge = report.dials.ge,
                        "Sync tick"
                    );
                }
                _ = beam.tick() => {
                    dashboard.beam_tick().await;
                }
            }
        }

        tracing::info!("Dashboard ticks stopped");
    })
}
