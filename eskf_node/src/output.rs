//! JSON-lines pose sink.

use chrono::{DateTime, Utc};
use eskf_dispatch::{
    OutputPose, PoseReceiver,
    message::{QuaternionMsg, Vector3Msg},
};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{self, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info};

/// One published pose as written to the output file.
///
/// The covariance is the 6x6 matrix in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub seq: u64,
    pub stamp: DateTime<Utc>,
    pub frame_id: String,
    pub position: Vector3Msg,
    pub orientation: QuaternionMsg,
    pub covariance: Vec<f64>,
}

impl From<&OutputPose> for PoseRecord {
    fn from(pose: &OutputPose) -> Self {
        Self {
            seq: pose.header.seq,
            stamp: pose.header.stamp,
            frame_id: pose.header.frame_id.clone(),
            position: pose.position.into(),
            orientation: pose.orientation.into(),
            covariance: pose.covariance.transpose().iter().copied().collect(),
        }
    }
}

/// Write every pose from `poses` to `writer`, one JSON object per line,
/// until the publisher goes away. Returns the number of records written.
pub async fn write_poses<W>(mut poses: PoseReceiver, writer: W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);
    let mut written = 0u64;

    while let Some(pose) = poses.recv().await {
        let mut line = serde_json::to_vec(&PoseRecord::from(&pose))?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .wrap_err("Failed to write pose record")?;
        written += 1;

        // Keep the output readable while the node is still running.
        if poses.is_empty() {
            writer.flush().await?;
        }
    }

    writer.flush().await?;
    debug!(written, "Pose stream closed");
    Ok(written)
}

/// Write poses to `path`, or to standard output when no path is given.
pub async fn write_poses_to(path: Option<&Path>, poses: PoseReceiver) -> Result<u64> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .wrap_err_with(|| format!("Failed to create output file: {}", path.display()))?;
            info!(path = %path.display(), "Writing poses");
            write_poses(poses, file).await
        }
        None => write_poses(poses, io::stdout()).await,
    }
}
