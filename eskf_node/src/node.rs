//! EskfNode implementation.

use crate::{
    config::Config,
    output,
    replay::{self, Pacing, ReplayStats},
};
use eskf_dispatch::{DispatchStats, Estimator, PoseHold, Runner, Vec3};
use eyre::{Result, WrapErr};
use tokio::{signal, sync::oneshot, time::sleep};
use tracing::{info, warn};

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub replay: ReplayStats,
    pub dispatch: DispatchStats,
    pub published: u64,
    /// Published poses the writer did not keep up with.
    pub dropped: u64,
    pub written: u64,
    /// Position held by the estimator when the run ended.
    pub final_position: Vec3,
    /// True when the run was cut short by ctrl-c.
    pub interrupted: bool,
}

/// Replays a recording through the dispatch runner and writes the
/// published poses.
pub struct EskfNode {
    config: Config,
}

impl EskfNode {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn pacing(&self) -> Pacing {
        if self.config.replay.realtime {
            Pacing::Realtime {
                max_gap: self.config.replay.max_gap,
            }
        } else {
            Pacing::Burst
        }
    }

    /// Load the recording and report what a run would do, without running.
    pub async fn check(&self) -> Result<()> {
        let records = replay::load_records(&self.config.replay.path).await?;
        let mask = self.config.dispatch.fusion_mask;

        for (channel, count) in replay::count_by_channel(&records) {
            let subscribed = mask.subscribes(channel);
            info!(channel = %channel, records = count, subscribed, "Recording contents");
        }
        info!(
            fusion_mask = %mask,
            publish_rate = self.config.dispatch.publish_rate,
            pacing = ?self.pacing(),
            "Configuration is valid"
        );
        Ok(())
    }

    /// Run the replay to completion.
    ///
    /// Publication keeps going for `linger` after the last record has been
    /// delivered. Ctrl-c ends the run early; poses published up to that
    /// point are still written.
    pub async fn run(self) -> Result<RunSummary> {
        let records = replay::load_records(&self.config.replay.path).await?;
        let pacing = self.pacing();

        let (runner, subscriptions, poses) =
            Runner::new(self.config.dispatch.clone(), PoseHold::new())?;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let runner_handle = tokio::spawn(runner.run_until(async move {
            let _ = stop_rx.await;
        }));

        let output_path = self.config.output.path.clone();
        let writer_handle =
            tokio::spawn(async move { output::write_poses_to(output_path.as_deref(), poses).await });

        let mut interrupted = false;
        let replay_stats = tokio::select! {
            stats = replay::replay(records, subscriptions, pacing) => stats?,
            res = signal::ctrl_c() => {
                res.wrap_err("Failed to listen for ctrl-c")?;
                warn!("Interrupted during replay");
                interrupted = true;
                ReplayStats::default()
            }
        };

        if !interrupted && !self.config.linger.is_zero() {
            info!(linger = ?self.config.linger, "Replay done, lingering");
            tokio::select! {
                _ = sleep(self.config.linger) => {}
                res = signal::ctrl_c() => {
                    res.wrap_err("Failed to listen for ctrl-c")?;
                    warn!("Interrupted while lingering");
                    interrupted = true;
                }
            }
        }

        let _ = stop_tx.send(());
        let finished = runner_handle.await.wrap_err("Dispatch runner panicked")??;
        let written = writer_handle.await.wrap_err("Pose writer panicked")??;

        let summary = RunSummary {
            replay: replay_stats,
            final_position: finished.estimator.position(),
            dispatch: finished.stats,
            published: finished.published,
            dropped: finished.dropped,
            written,
            interrupted,
        };

        info!(
            delivered = summary.replay.delivered,
            skipped = summary.replay.skipped,
            forwarded = summary.dispatch.total_forwarded(),
            published = summary.published,
            dropped = summary.dropped,
            written = summary.written,
            "Run complete"
        );
        Ok(summary)
    }
}
