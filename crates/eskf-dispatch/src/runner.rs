//! The dispatch loop.
//!
//! [`Runner`] ties together the subscription queue, the [`Dispatcher`] and
//! the [`Publisher`]. One task owns all three and alternates between the
//! next queued message and the next publish tick, so the estimator is never
//! read while a measurement is being ingested and no locking is needed.
//! Each message or tick is handled to completion before the next one; a
//! slow estimator call stalls both ingestion and publication.

use crate::{
    config::DispatchConfig,
    dispatch::{DispatchStats, Dispatcher},
    estimator::Estimator,
    message::SensorEvent,
    publisher::{PoseReceiver, Publisher},
    subscription::Subscriptions,
};
use eyre::Result;
use std::{
    future::{self, Future},
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

const STATS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// State handed back when the loop ends.
#[derive(Debug)]
pub struct Finished<E> {
    pub estimator: E,
    pub stats: DispatchStats,
    /// Number of poses published.
    pub published: u64,
    /// Published poses the receiver never got.
    pub dropped: u64,
}

/// Single-task dispatch and publication loop.
///
/// # Example
///
/// ```ignore
/// let (runner, subs, mut poses) = Runner::new(DispatchConfig::default(), PoseHold::new())?;
/// tokio::spawn(runner.run());
///
/// subs.imu.deliver(imu_msg)?;
/// while let Some(pose) = poses.recv().await {
///     println!("{} {:?}", pose.header.seq, pose.position);
/// }
/// ```
pub struct Runner<E> {
    dispatcher: Dispatcher<E>,
    publisher: Publisher,
    rx: mpsc::UnboundedReceiver<SensorEvent>,
    config: DispatchConfig,
}

impl<E> Runner<E>
where
    E: Estimator,
{
    /// Create the runner, the subscription handles for the configured
    /// fusion mask, and the receiver of published poses.
    ///
    /// The estimator is configured with the same mask the handles were
    /// derived from.
    pub fn new(config: DispatchConfig, estimator: E) -> Result<(Self, Subscriptions, PoseReceiver)> {
        config.validate()?;

        let mask = config.fusion_mask;
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriptions = Subscriptions::create(mask, tx);

        let dispatcher = Dispatcher::new(estimator, mask);
        let (publisher, poses) = Publisher::channel(config.frame_id.clone());

        info!(
            fusion_mask = %mask,
            publish_rate = config.publish_rate,
            frame_id = %config.frame_id,
            channels = ?subscriptions.channels(),
            "Initialized dispatch runner"
        );

        let runner = Self {
            dispatcher,
            publisher,
            rx,
            config,
        };
        Ok((runner, subscriptions, poses))
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher<E> {
        &self.dispatcher
    }

    /// Run until every subscription handle has been dropped and the queue
    /// is drained.
    pub async fn run(self) -> Result<Finished<E>> {
        self.run_loop(future::pending::<()>(), true).await
    }

    /// Run until `shutdown` completes. Publication continues after the
    /// input handles are dropped.
    pub async fn run_until<F>(self, shutdown: F) -> Result<Finished<E>>
    where
        F: Future<Output = ()>,
    {
        self.run_loop(shutdown, false).await
    }

    async fn run_loop<F>(mut self, shutdown: F, stop_on_close: bool) -> Result<Finished<E>>
    where
        F: Future<Output = ()>,
    {
        let period = self.config.publish_period();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(period = ?period, "Starting dispatch loop");

        let mut inputs_open = true;
        let mut last_stats_log = Instant::now();

        loop {
            // Due ticks first, then queued input; shutdown is only taken
            // once the queue is empty.
            tokio::select! {
                biased;

                _ = ticker.tick() => {
                    self.publisher.tick(self.dispatcher.estimator());
                }
                event = self.rx.recv(), if inputs_open => match event {
                    Some(event) => {
                        self.dispatcher.dispatch(event);
                    }
                    None => {
                        info!("All subscriptions closed");
                        inputs_open = false;
                        if stop_on_close {
                            break;
                        }
                    }
                },
                () = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
            }

            if last_stats_log.elapsed() >= STATS_LOG_INTERVAL {
                self.log_stats();
                last_stats_log = Instant::now();
            }
        }

        info!("Dispatch loop ended");
        self.log_stats();

        let published = self.publisher.next_seq();
        let dropped = self.publisher.dropped();
        let stats = self.dispatcher.stats().clone();
        Ok(Finished {
            estimator: self.dispatcher.into_estimator(),
            stats,
            published,
            dropped,
        })
    }

    fn log_stats(&self) {
        let stats = self.dispatcher.stats();
        for (channel, counters) in &stats.channels {
            info!(
                channel = %channel,
                received = counters.received,
                forwarded = counters.forwarded,
                non_monotonic = counters.non_monotonic,
                "Channel statistics"
            );
        }
        info!(
            published = self.publisher.next_seq(),
            dropped = self.publisher.dropped(),
            unsubscribed = stats.unsubscribed,
            "Dispatch statistics"
        );
    }
}
