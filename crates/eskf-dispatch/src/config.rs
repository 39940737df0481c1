use crate::{mask::FusionMask, publisher::DEFAULT_FRAME_ID};
use eyre::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default publication rate in Hz.
pub const DEFAULT_PUBLISH_RATE: f64 = 100.0;

/// Startup parameters passed to [`Runner::new`](crate::Runner::new).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Channels to subscribe and fuse.
    #[serde(default)]
    pub fusion_mask: FusionMask,
    /// Pose publication rate in Hz.
    #[serde(default = "default_publish_rate")]
    pub publish_rate: f64,
    /// Frame id stamped on published poses.
    #[serde(default = "default_frame_id")]
    pub frame_id: String,
}

fn default_publish_rate() -> f64 {
    DEFAULT_PUBLISH_RATE
}

fn default_frame_id() -> String {
    DEFAULT_FRAME_ID.to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fusion_mask: FusionMask::default(),
            publish_rate: DEFAULT_PUBLISH_RATE,
            frame_id: default_frame_id(),
        }
    }
}

impl DispatchConfig {
    pub fn new(fusion_mask: FusionMask, publish_rate: f64) -> Self {
        Self {
            fusion_mask,
            publish_rate,
            ..Self::default()
        }
    }

    /// Set the frame id of published poses.
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = frame_id.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.publish_rate.is_finite() && self.publish_rate > 0.0,
            "publish_rate must be a positive number of Hz, got {}",
            self.publish_rate
        );
        ensure!(
            self.period_nanos() >= 1.0,
            "publish_rate {} Hz is too high",
            self.publish_rate
        );
        ensure!(!self.frame_id.is_empty(), "frame_id cannot be empty");
        Ok(())
    }

    /// Interval between two publications, rounded to whole nanoseconds.
    pub fn publish_period(&self) -> Duration {
        Duration::from_nanos(self.period_nanos() as u64)
    }

    fn period_nanos(&self) -> f64 {
        (1e9 / self.publish_rate).round()
    }
}
