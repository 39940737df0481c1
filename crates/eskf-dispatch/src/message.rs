//! Raw sensor messages as delivered by the transport.
//!
//! The field layout follows the usual robotics message definitions
//! (`sensor_msgs/Imu`, `nav_msgs/Odometry`, `mavros_msgs/OpticalFlowRad`,
//! `mavros_msgs/ExtendedState`) flattened to what the dispatch layer reads.
//! All types derive serde so recorded streams can be replayed.

use crate::{
    channel::Channel,
    types::{Quat, Stamp, Vec2, Vec3, WithTimestamp},
};
use eyre::bail;
use nalgebra::Quaternion;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Stamp,
    #[serde(default)]
    pub frame_id: String,
}

impl Header {
    pub fn at(stamp: Stamp) -> Self {
        Self {
            stamp,
            frame_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3Msg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3Msg {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<Vector3Msg> for Vec3 {
    fn from(v: Vector3Msg) -> Vec3 {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for Vector3Msg {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuaternionMsg {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for QuaternionMsg {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl From<QuaternionMsg> for Quat {
    /// Normalizes the incoming quaternion; a zero quaternion yields NaNs,
    /// which are left for the estimator to reject.
    fn from(q: QuaternionMsg) -> Quat {
        Quat::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
    }
}

impl From<Quat> for QuaternionMsg {
    fn from(q: Quat) -> Self {
        Self {
            x: q.i,
            y: q.j,
            z: q.k,
            w: q.w,
        }
    }
}

/// Inertial measurement (`sensor_msgs/Imu`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImuMsg {
    pub header: Header,
    pub angular_velocity: Vector3Msg,
    pub linear_acceleration: Vector3Msg,
}

/// Visual pose estimate (`geometry_msgs/PoseWithCovarianceStamped`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseMsg {
    pub header: Header,
    pub position: Vector3Msg,
    pub orientation: QuaternionMsg,
}

/// GPS odometry (`nav_msgs/Odometry`), position and linear twist only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OdometryMsg {
    pub header: Header,
    pub position: Vector3Msg,
    pub linear_velocity: Vector3Msg,
}

/// Integrated optical flow (`mavros_msgs/OpticalFlowRad`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpticalFlowMsg {
    pub header: Header,
    pub integration_time_us: u32,
    pub integrated_x: f32,
    pub integrated_y: f32,
    pub integrated_xgyro: f32,
    pub integrated_ygyro: f32,
    pub distance: f32,
    pub quality: u8,
}

impl OpticalFlowMsg {
    pub fn integrated_xy(&self) -> Vec2 {
        Vec2::new(self.integrated_x as f64, self.integrated_y as f64)
    }

    pub fn integrated_gyro_xy(&self) -> Vec2 {
        Vec2::new(self.integrated_xgyro as f64, self.integrated_ygyro as f64)
    }
}

/// Vehicle landed state reported by the flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum LandedState {
    #[default]
    Undefined = 0,
    OnGround = 1,
    InAir = 2,
    Takeoff = 3,
    Landing = 4,
}

impl LandedState {
    const IN_AIR_BIT: u8 = LandedState::InAir as u8;

    /// Airborne when the in-air bit of the raw value is set, which covers
    /// `InAir` and `Takeoff`.
    pub fn in_air(self) -> bool {
        (self as u8) & Self::IN_AIR_BIT != 0
    }
}

impl TryFrom<u8> for LandedState {
    type Error = eyre::Report;

    fn try_from(raw: u8) -> eyre::Result<Self> {
        Ok(match raw {
            0 => LandedState::Undefined,
            1 => LandedState::OnGround,
            2 => LandedState::InAir,
            3 => LandedState::Takeoff,
            4 => LandedState::Landing,
            _ => bail!("Invalid landed state: {}", raw),
        })
    }
}

impl From<LandedState> for u8 {
    fn from(state: LandedState) -> u8 {
        state as u8
    }
}

/// Flight controller extended state (`mavros_msgs/ExtendedState`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtendedStateMsg {
    pub header: Header,
    pub landed_state: LandedState,
}

macro_rules! impl_with_timestamp {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WithTimestamp for $ty {
                fn timestamp(&self) -> Duration {
                    self.header.stamp.to_duration()
                }
            }
        )*
    };
}

impl_with_timestamp!(ImuMsg, PoseMsg, OdometryMsg, OpticalFlowMsg, ExtendedStateMsg);

/// A raw message tagged with the channel it arrived on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum SensorEvent {
    Imu(ImuMsg),
    Vision(PoseMsg),
    Gps(OdometryMsg),
    OpticalFlow(OpticalFlowMsg),
    #[serde(rename = "extended_state")]
    GroundContact(ExtendedStateMsg),
}

impl SensorEvent {
    pub fn channel(&self) -> Channel {
        match self {
            SensorEvent::Imu(_) => Channel::Imu,
            SensorEvent::Vision(_) => Channel::Vision,
            SensorEvent::Gps(_) => Channel::Gps,
            SensorEvent::OpticalFlow(_) => Channel::OpticalFlow,
            SensorEvent::GroundContact(_) => Channel::GroundContact,
        }
    }
}

impl WithTimestamp for SensorEvent {
    fn timestamp(&self) -> Duration {
        match self {
            SensorEvent::Imu(msg) => msg.timestamp(),
            SensorEvent::Vision(msg) => msg.timestamp(),
            SensorEvent::Gps(msg) => msg.timestamp(),
            SensorEvent::OpticalFlow(msg) => msg.timestamp(),
            SensorEvent::GroundContact(msg) => msg.timestamp(),
        }
    }
}

/// A raw message type bound to exactly one channel.
pub trait ChannelMessage: Into<SensorEvent> + WithTimestamp {
    const CHANNEL: Channel;
}

macro_rules! impl_channel_message {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SensorEvent {
                fn from(msg: $ty) -> Self {
                    SensorEvent::$variant(msg)
                }
            }

            impl ChannelMessage for $ty {
                const CHANNEL: Channel = Channel::$variant;
            }
        )*
    };
}

impl_channel_message!(
    ImuMsg => Imu,
    PoseMsg => Vision,
    OdometryMsg => Gps,
    OpticalFlowMsg => OpticalFlow,
    ExtendedStateMsg => GroundContact,
);
