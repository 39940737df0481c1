use crate::types::seconds_between;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// One sensor input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Imu,
    Vision,
    Gps,
    OpticalFlow,
    GroundContact,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Imu,
        Channel::Vision,
        Channel::Gps,
        Channel::OpticalFlow,
        Channel::GroundContact,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Imu => "imu",
            Channel::Vision => "vision",
            Channel::Gps => "gps",
            Channel::OpticalFlow => "optical_flow",
            Channel::GroundContact => "ground_contact",
        }
    }

    /// Channels that carry a delta time and bootstrap on their first sample.
    pub fn is_timed(self) -> bool {
        !matches!(self, Channel::GroundContact)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Timing state of a single channel.
///
/// `last_timestamp` stays `None` until the first sample has been observed,
/// so a zero stamp is an ordinary value rather than a sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelState {
    last_timestamp: Option<Duration>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_timestamp(&self) -> Option<Duration> {
        self.last_timestamp
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.last_timestamp.is_some()
    }

    /// Record a sample at `timestamp` and return the elapsed seconds since
    /// the previous one, or `None` for the bootstrap sample.
    ///
    /// The returned delta is not checked: it is zero or negative when the
    /// stamps do not increase.
    pub fn advance(&mut self, timestamp: Duration) -> Option<f64> {
        let dt = self
            .last_timestamp
            .map(|prev| seconds_between(timestamp, prev));
        self.last_timestamp = Some(timestamp);
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_then_delta() {
        let mut state = ChannelState::new();
        assert_eq!(state.last_timestamp(), None);

        assert_eq!(state.advance(Duration::from_micros(100_000)), None);
        assert_eq!(state.last_timestamp(), Some(Duration::from_micros(100_000)));

        assert_eq!(state.advance(Duration::from_micros(150_000)), Some(0.05));
        assert_eq!(state.last_timestamp(), Some(Duration::from_micros(150_000)));
    }

    #[test]
    fn test_zero_stamp_bootstraps_once() {
        let mut state = ChannelState::new();
        assert_eq!(state.advance(Duration::ZERO), None);
        assert!(state.is_bootstrapped());
        assert_eq!(state.advance(Duration::from_millis(10)), Some(0.01));
    }

    #[test]
    fn test_non_monotonic_passes_through() {
        let mut state = ChannelState::new();
        state.advance(Duration::from_millis(200));
        assert_eq!(state.advance(Duration::from_millis(200)), Some(0.0));
        assert_eq!(state.advance(Duration::from_millis(150)), Some(-0.05));
        assert_eq!(state.last_timestamp(), Some(Duration::from_millis(150)));
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::OpticalFlow.to_string(), "optical_flow");
        assert!(!Channel::GroundContact.is_timed());
        assert!(Channel::ALL.iter().filter(|c| c.is_timed()).count() == 4);
    }
}
