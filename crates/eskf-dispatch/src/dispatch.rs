//! Measurement adapters.
//!
//! [`Dispatcher`] owns the estimator and the timing state of every
//! subscribed channel. Each raw message is converted into its typed
//! measurement and forwarded, except for the first sample of a timed
//! channel, which only seeds the channel's timestamp.

use crate::{
    channel::{Channel, ChannelState},
    estimator::Estimator,
    mask::FusionMask,
    measurement::{GpsFix, GroundContact, InertialSample, OpticalFlow, VisionPose},
    message::{ExtendedStateMsg, ImuMsg, OdometryMsg, OpticalFlowMsg, PoseMsg, SensorEvent},
    types::WithTimestamp,
};
use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};

/// What happened to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A measurement was handed to the estimator.
    Forwarded,
    /// First sample on the channel; timing seeded, nothing forwarded.
    Bootstrap,
    /// The fusion mask disables the channel; the message was dropped.
    Unsubscribed,
}

/// Per-channel counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub received: u64,
    pub forwarded: u64,
    /// Forwarded samples whose dt was zero or negative.
    pub non_monotonic: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Counters for each subscribed channel, in channel order.
    pub channels: IndexMap<Channel, ChannelStats>,
    /// Messages dropped because their channel is not subscribed.
    pub unsubscribed: u64,
}

impl DispatchStats {
    fn new(mask: FusionMask) -> Self {
        let channels = Channel::ALL
            .into_iter()
            .filter(|&channel| mask.subscribes(channel))
            .map(|channel| (channel, ChannelStats::default()))
            .collect();
        Self {
            channels,
            unsubscribed: 0,
        }
    }

    pub fn channel(&self, channel: Channel) -> ChannelStats {
        self.channels.get(&channel).copied().unwrap_or_default()
    }

    pub fn total_forwarded(&self) -> u64 {
        self.channels.values().map(|s| s.forwarded).sum()
    }
}

/// Routes raw sensor messages to an [`Estimator`].
pub struct Dispatcher<E> {
    estimator: E,
    mask: FusionMask,
    /// Timing state of the subscribed timed channels only.
    timing: IndexMap<Channel, ChannelState>,
    stats: DispatchStats,
}

impl<E> Dispatcher<E>
where
    E: Estimator,
{
    /// Create a dispatcher and configure the estimator with `mask`.
    pub fn new(mut estimator: E, mask: FusionMask) -> Self {
        estimator.configure(mask);

        let timing = Channel::ALL
            .into_iter()
            .filter(|&channel| channel.is_timed() && mask.subscribes(channel))
            .map(|channel| (channel, ChannelState::new()))
            .collect();

        Self {
            estimator,
            mask,
            timing,
            stats: DispatchStats::new(mask),
        }
    }

    pub fn mask(&self) -> FusionMask {
        self.mask
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn into_estimator(self) -> E {
        self.estimator
    }

    /// Timing state of a timed channel, `None` if it is not subscribed.
    pub fn channel_state(&self, channel: Channel) -> Option<&ChannelState> {
        self.timing.get(&channel)
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Route a message to the adapter of its channel.
    pub fn dispatch(&mut self, event: SensorEvent) -> Outcome {
        match &event {
            SensorEvent::Imu(msg) => self.on_imu(msg),
            SensorEvent::Vision(msg) => self.on_vision(msg),
            SensorEvent::Gps(msg) => self.on_gps(msg),
            SensorEvent::OpticalFlow(msg) => self.on_optical_flow(msg),
            SensorEvent::GroundContact(msg) => self.on_extended_state(msg),
        }
    }

    pub fn on_imu(&mut self, msg: &ImuMsg) -> Outcome {
        self.forward_timed(Channel::Imu, msg, |estimator, msg, dt| {
            estimator.ingest_inertial(InertialSample::from_msg(msg, dt))
        })
    }

    pub fn on_vision(&mut self, msg: &PoseMsg) -> Outcome {
        self.forward_timed(Channel::Vision, msg, |estimator, msg, dt| {
            estimator.ingest_vision(VisionPose::from_msg(msg, dt))
        })
    }

    pub fn on_gps(&mut self, msg: &OdometryMsg) -> Outcome {
        self.forward_timed(Channel::Gps, msg, |estimator, msg, dt| {
            estimator.ingest_gps(GpsFix::from_msg(msg, dt))
        })
    }

    pub fn on_optical_flow(&mut self, msg: &OpticalFlowMsg) -> Outcome {
        self.forward_timed(Channel::OpticalFlow, msg, |estimator, msg, dt| {
            estimator.ingest_optical_flow(OpticalFlow::from_msg(msg, dt))
        })
    }

    /// Ground contact has no timing: every message is forwarded.
    pub fn on_extended_state(&mut self, msg: &ExtendedStateMsg) -> Outcome {
        let contact = GroundContact::from(msg);

        let stats = self
            .stats
            .channels
            .entry(Channel::GroundContact)
            .or_default();
        stats.received += 1;
        stats.forwarded += 1;

        trace!(
            landed_state = ?msg.landed_state,
            in_air = contact.in_air,
            "Forwarding ground contact"
        );
        self.estimator.set_ground_contact(contact.in_air);
        Outcome::Forwarded
    }

    fn forward_timed<M, F>(&mut self, channel: Channel, msg: &M, ingest: F) -> Outcome
    where
        M: WithTimestamp,
        F: FnOnce(&mut E, &M, f64),
    {
        let Some(state) = self.timing.get_mut(&channel) else {
            self.stats.unsubscribed += 1;
            warn!(channel = %channel, mask = %self.mask, "Dropping message on unsubscribed channel");
            return Outcome::Unsubscribed;
        };

        let timestamp = msg.timestamp();
        let stats = self.stats.channels.entry(channel).or_default();
        stats.received += 1;

        let Some(dt) = state.advance(timestamp) else {
            if timestamp.is_zero() {
                warn!(
                    channel = %channel,
                    "First sample has a zero timestamp; the stamp source may be unset"
                );
            }
            info!(channel = %channel, timestamp = ?timestamp, "Channel timing initialized");
            return Outcome::Bootstrap;
        };

        if dt <= 0.0 {
            stats.non_monotonic += 1;
            debug!(channel = %channel, timestamp = ?timestamp, dt, "Non-increasing timestamp");
        }

        trace!(channel = %channel, timestamp = ?timestamp, dt, "Forwarding measurement");
        ingest(&mut self.estimator, msg, dt);
        stats.forwarded += 1;
        Outcome::Forwarded
    }
}
