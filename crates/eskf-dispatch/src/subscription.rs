//! Typed subscription handles feeding the dispatch queue.
//!
//! Every handle pushes into the same FIFO queue, which a single runner task
//! drains. Messages are therefore dispatched one at a time in arrival order,
//! and per-channel timing state never sees interleaved updates.
//!
//! A handle exists only for channels the fusion mask enables, so a message
//! on a disabled channel cannot be delivered at all.

use crate::{
    channel::Channel,
    mask::FusionMask,
    message::{
        ChannelMessage, ExtendedStateMsg, ImuMsg, OdometryMsg, OpticalFlowMsg, PoseMsg,
        SensorEvent,
    },
};
use eyre::{Result, eyre};
use std::{fmt, marker::PhantomData};
use tokio::sync::mpsc;
use tracing::info;

/// Sender half for one channel.
pub struct Subscription<M> {
    tx: mpsc::UnboundedSender<SensorEvent>,
    _msg: PhantomData<fn(M)>,
}

impl<M> Subscription<M>
where
    M: ChannelMessage,
{
    fn new(tx: mpsc::UnboundedSender<SensorEvent>) -> Self {
        info!(channel = %M::CHANNEL, "Subscribing to {}", M::CHANNEL);
        Self {
            tx,
            _msg: PhantomData,
        }
    }

    pub fn channel(&self) -> Channel {
        M::CHANNEL
    }

    /// Queue a message for dispatch.
    ///
    /// Fails only when the runner has stopped.
    pub fn deliver(&self, msg: M) -> Result<()> {
        self.tx
            .send(msg.into())
            .map_err(|_| eyre!("Dispatch runner stopped; {} message dropped", M::CHANNEL))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<M> Clone for Subscription<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            _msg: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Subscription<M>
where
    M: ChannelMessage,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &M::CHANNEL)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// The set of handles created for a fusion mask.
///
/// Inertial and ground-contact handles always exist; the optional ones are
/// `Some` exactly when the mask enables their channel. The runner stops
/// consuming input once every handle (and clone) has been dropped.
#[derive(Debug, Clone)]
pub struct Subscriptions {
    pub imu: Subscription<ImuMsg>,
    pub ground_contact: Subscription<ExtendedStateMsg>,
    pub vision: Option<Subscription<PoseMsg>>,
    pub gps: Option<Subscription<OdometryMsg>>,
    pub optical_flow: Option<Subscription<OpticalFlowMsg>>,
}

impl Subscriptions {
    pub(crate) fn create(mask: FusionMask, tx: mpsc::UnboundedSender<SensorEvent>) -> Self {
        let optional = |channel: Channel| mask.subscribes(channel).then(|| tx.clone());

        Self {
            imu: Subscription::new(tx.clone()),
            vision: optional(Channel::Vision).map(Subscription::new),
            gps: optional(Channel::Gps).map(Subscription::new),
            optical_flow: optional(Channel::OpticalFlow).map(Subscription::new),
            ground_contact: Subscription::new(tx),
        }
    }

    /// Channels that have a handle.
    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|&channel| self.is_subscribed(channel))
            .collect()
    }

    pub fn is_subscribed(&self, channel: Channel) -> bool {
        match channel {
            Channel::Imu | Channel::GroundContact => true,
            Channel::Vision => self.vision.is_some(),
            Channel::Gps => self.gps.is_some(),
            Channel::OpticalFlow => self.optical_flow.is_some(),
        }
    }

    /// Route an untyped event to its handle.
    ///
    /// Returns `Ok(false)` without queueing anything when the event's
    /// channel has no handle.
    pub fn deliver(&self, event: SensorEvent) -> Result<bool> {
        match event {
            SensorEvent::Imu(msg) => self.imu.deliver(msg)?,
            SensorEvent::GroundContact(msg) => self.ground_contact.deliver(msg)?,
            SensorEvent::Vision(msg) => match &self.vision {
                Some(sub) => sub.deliver(msg)?,
                None => return Ok(false),
            },
            SensorEvent::Gps(msg) => match &self.gps {
                Some(sub) => sub.deliver(msg)?,
                None => return Ok(false),
            },
            SensorEvent::OpticalFlow(msg) => match &self.optical_flow {
                Some(sub) => sub.deliver(msg)?,
                None => return Ok(false),
            },
        }
        Ok(true)
    }
}
