//! Recorded sensor stream playback.
//!
//! A recording is a JSON-lines file with one [`SensorEvent`] per line,
//! tagged by `channel`:
//!
//! ```text
//! {"channel":"imu","header":{"stamp":{"sec":12,"nanosec":5000000}},"angular_velocity":{"x":0.0,"y":0.0,"z":0.1},"linear_acceleration":{"x":0.0,"y":0.0,"z":9.81}}
//! {"channel":"extended_state","header":{"stamp":{"sec":12,"nanosec":0}},"landed_state":2}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Records are
//! delivered in file order through the node's subscriptions; records for a
//! channel the fusion mask leaves unsubscribed are skipped.

use eskf_dispatch::{Channel, SensorEvent, Subscriptions, WithTimestamp};
use eyre::{Result, WrapErr};
use futures::stream::{self, TryStreamExt};
use indexmap::IndexMap;
use std::{path::Path, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info};

/// How fast records are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Deliver back to back.
    Burst,
    /// Sleep for the stamp gap between consecutive records, capped at
    /// `max_gap`. Non-increasing stamps are delivered without delay.
    Realtime { max_gap: Duration },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub delivered: u64,
    /// Records whose channel has no subscription.
    pub skipped: u64,
}

/// Parse a JSON-lines recording.
pub fn parse_records(contents: &str) -> Result<Vec<SensorEvent>> {
    contents
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| {
            serde_json::from_str(line)
                .wrap_err_with(|| format!("Invalid sensor record at line {}", line_no))
        })
        .collect()
}

/// Read and parse a recording from disk.
pub async fn load_records(path: &Path) -> Result<Vec<SensorEvent>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Failed to read recording: {}", path.display()))?;
    let records = parse_records(&contents)
        .wrap_err_with(|| format!("Failed to parse recording: {}", path.display()))?;

    info!(path = %path.display(), records = records.len(), "Loaded recording");
    Ok(records)
}

/// Number of records per channel, in first-seen order.
pub fn count_by_channel(records: &[SensorEvent]) -> IndexMap<Channel, usize> {
    let mut counts = IndexMap::new();
    for record in records {
        *counts.entry(record.channel()).or_insert(0) += 1;
    }
    counts
}

/// Deliver `records` through `subscriptions`.
///
/// The subscriptions are dropped when the replay ends, which closes the
/// runner's input queue.
pub async fn replay(
    records: Vec<SensorEvent>,
    subscriptions: Subscriptions,
    pacing: Pacing,
) -> Result<ReplayStats> {
    let subs = &subscriptions;

    let (stats, _) = stream::iter(records.into_iter().map(eyre::Ok))
        .try_fold(
            (ReplayStats::default(), None::<Duration>),
            |(mut stats, prev), event| async move {
                let timestamp = event.timestamp();

                if let (Pacing::Realtime { max_gap }, Some(prev)) = (pacing, prev)
                    && let Some(gap) = timestamp.checked_sub(prev)
                    && !gap.is_zero()
                {
                    sleep(gap.min(max_gap)).await;
                }

                let channel = event.channel();
                if subs.deliver(event)? {
                    stats.delivered += 1;
                } else {
                    stats.skipped += 1;
                    debug!(channel = %channel, timestamp = ?timestamp, "Skipping record on unsubscribed channel");
                }

                Ok((stats, Some(timestamp)))
            },
        )
        .await?;

    info!(
        delivered = stats.delivered,
        skipped = stats.skipped,
        "Replay finished"
    );
    Ok(stats)
}
