//! Typed measurements handed to the [`Estimator`](crate::Estimator).
//!
//! Each timed measurement carries the elapsed seconds since the previous
//! sample on its channel (`dt`) and the sample time in microseconds. They
//! are moved into the estimator and consumed there exactly once.

use crate::{
    channel::Channel,
    message::{ExtendedStateMsg, ImuMsg, OdometryMsg, OpticalFlowMsg, PoseMsg},
    types::{Quat, Vec2, Vec3, WithTimestamp, duration_to_micros},
};

#[derive(Debug, Clone, PartialEq)]
pub struct InertialSample {
    /// Measured angular rate (rad/s).
    pub angular_rate: Vec3,
    /// Measured linear acceleration (m/s²).
    pub linear_accel: Vec3,
    pub time_us: u64,
    pub dt: f64,
}

impl InertialSample {
    pub fn from_msg(msg: &ImuMsg, dt: f64) -> Self {
        Self {
            angular_rate: msg.angular_velocity.into(),
            linear_accel: msg.linear_acceleration.into(),
            time_us: duration_to_micros(msg.timestamp()),
            dt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisionPose {
    pub orientation: Quat,
    pub position: Vec3,
    pub time_us: u64,
    pub dt: f64,
}

impl VisionPose {
    pub fn from_msg(msg: &PoseMsg, dt: f64) -> Self {
        Self {
            orientation: msg.orientation.into(),
            position: msg.position.into(),
            time_us: duration_to_micros(msg.timestamp()),
            dt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    pub velocity: Vec3,
    pub position: Vec3,
    pub time_us: u64,
    pub dt: f64,
}

impl GpsFix {
    pub fn from_msg(msg: &OdometryMsg, dt: f64) -> Self {
        Self {
            velocity: msg.linear_velocity.into(),
            position: msg.position.into(),
            time_us: duration_to_micros(msg.timestamp()),
            dt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpticalFlow {
    pub integrated_xy: Vec2,
    pub integrated_gyro_xy: Vec2,
    pub integration_time_us: u32,
    /// Distance to the imaged surface (m).
    pub distance: f64,
    pub quality: u8,
    pub time_us: u64,
    pub dt: f64,
}

impl OpticalFlow {
    pub fn from_msg(msg: &OpticalFlowMsg, dt: f64) -> Self {
        Self {
            integrated_xy: msg.integrated_xy(),
            integrated_gyro_xy: msg.integrated_gyro_xy(),
            integration_time_us: msg.integration_time_us,
            distance: msg.distance as f64,
            quality: msg.quality,
            time_us: duration_to_micros(msg.timestamp()),
            dt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundContact {
    pub in_air: bool,
}

impl From<&ExtendedStateMsg> for GroundContact {
    fn from(msg: &ExtendedStateMsg) -> Self {
        Self {
            in_air: msg.landed_state.in_air(),
        }
    }
}

/// Any measurement the dispatch layer can forward.
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Inertial(InertialSample),
    Vision(VisionPose),
    Gps(GpsFix),
    OpticalFlow(OpticalFlow),
    GroundContact(GroundContact),
}

impl Measurement {
    pub fn channel(&self) -> Channel {
        match self {
            Measurement::Inertial(_) => Channel::Imu,
            Measurement::Vision(_) => Channel::Vision,
            Measurement::Gps(_) => Channel::Gps,
            Measurement::OpticalFlow(_) => Channel::OpticalFlow,
            Measurement::GroundContact(_) => Channel::GroundContact,
        }
    }

    /// Delta time of a timed measurement; `None` for ground contact.
    pub fn dt(&self) -> Option<f64> {
        match self {
            Measurement::Inertial(m) => Some(m.dt),
            Measurement::Vision(m) => Some(m.dt),
            Measurement::Gps(m) => Some(m.dt),
            Measurement::OpticalFlow(m) => Some(m.dt),
            Measurement::GroundContact(_) => None,
        }
    }

    pub fn time_us(&self) -> Option<u64> {
        match self {
            Measurement::Inertial(m) => Some(m.time_us),
            Measurement::Vision(m) => Some(m.time_us),
            Measurement::Gps(m) => Some(m.time_us),
            Measurement::OpticalFlow(m) => Some(m.time_us),
            Measurement::GroundContact(_) => None,
        }
    }
}
