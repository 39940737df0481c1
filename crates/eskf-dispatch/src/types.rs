use serde::{Deserialize, Serialize};
use std::time::Duration;

pub type Vec2 = nalgebra::Vector2<f64>;
pub type Vec3 = nalgebra::Vector3<f64>;
pub type Quat = nalgebra::UnitQuaternion<f64>;
pub type Covariance = nalgebra::Matrix6<f64>;

/// Extracts the header timestamp from a raw sensor message.
pub trait WithTimestamp: Send {
    fn timestamp(&self) -> Duration;
}

/// Header timestamp as carried on the wire: seconds plus nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

impl Stamp {
    pub fn new(sec: i32, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    /// Builds a stamp from a microsecond count.
    pub fn from_micros(us: u64) -> Self {
        Self::from_duration(Duration::from_micros(us))
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self {
            sec: i32::try_from(duration.as_secs()).unwrap_or(i32::MAX),
            nanosec: duration.subsec_nanos(),
        }
    }

    pub fn to_duration(self) -> Duration {
        ros_time_to_duration(self.sec, self.nanosec)
    }
}

/// Convert a (sec, nanosec) pair to a [`Duration`] since the epoch.
///
/// Negative seconds clamp to zero, nanoseconds overflow into seconds.
pub fn ros_time_to_duration(sec: i32, nanosec: u32) -> Duration {
    if sec < 0 {
        return Duration::ZERO;
    }
    Duration::from_secs(sec as u64) + Duration::from_nanos(nanosec as u64)
}

/// Whole microseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_to_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Signed elapsed seconds from `earlier` to `later`.
///
/// The difference is taken on integer nanoseconds before the single
/// conversion to `f64`, so evenly spaced stamps yield the exact decimal gap.
pub fn seconds_between(later: Duration, earlier: Duration) -> f64 {
    let nanos = later.as_nanos() as i128 - earlier.as_nanos() as i128;
    nanos as f64 / 1e9
}
