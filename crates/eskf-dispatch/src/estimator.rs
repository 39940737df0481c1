//! The estimator boundary.
//!
//! The dispatch layer drives a stateful filter through [`Estimator`] and
//! never looks inside it. Calls are synchronous; an estimator that fails is
//! expected to panic, which terminates the node.

use crate::{
    mask::FusionMask,
    measurement::{GpsFix, InertialSample, OpticalFlow, VisionPose},
    types::{Quat, Vec3},
};

/// A stateful filter fusing measurements into an orientation and position.
pub trait Estimator: Send {
    /// Selects which optional measurements the filter fuses. Called once,
    /// before any measurement, with the mask the subscriptions derive from.
    fn configure(&mut self, mask: FusionMask);

    fn ingest_inertial(&mut self, sample: InertialSample);

    fn ingest_vision(&mut self, pose: VisionPose);

    fn ingest_gps(&mut self, fix: GpsFix);

    fn ingest_optical_flow(&mut self, flow: OpticalFlow);

    fn set_ground_contact(&mut self, in_air: bool);

    /// Current orientation belief.
    fn orientation(&self) -> Quat;

    /// Current position belief.
    fn position(&self) -> Vec3;
}

impl<E> Estimator for Box<E>
where
    E: Estimator + ?Sized,
{
    fn configure(&mut self, mask: FusionMask) {
        (**self).configure(mask)
    }

    fn ingest_inertial(&mut self, sample: InertialSample) {
        (**self).ingest_inertial(sample)
    }

    fn ingest_vision(&mut self, pose: VisionPose) {
        (**self).ingest_vision(pose)
    }

    fn ingest_gps(&mut self, fix: GpsFix) {
        (**self).ingest_gps(fix)
    }

    fn ingest_optical_flow(&mut self, flow: OpticalFlow) {
        (**self).ingest_optical_flow(flow)
    }

    fn set_ground_contact(&mut self, in_air: bool) {
        (**self).set_ground_contact(in_air)
    }

    fn orientation(&self) -> Quat {
        (**self).orientation()
    }

    fn position(&self) -> Vec3 {
        (**self).position()
    }
}

/// Minimal stand-in estimator for running the node without a filter.
///
/// Orientation is propagated by integrating the gyro rate and overwritten
/// by vision yaw fixes; position is latched from vision or GPS fixes
/// according to the fusion mask. Optical flow is accepted and ignored. It
/// models no uncertainty and is not a substitute for a Kalman filter.
#[derive(Debug, Clone)]
pub struct PoseHold {
    mask: FusionMask,
    orientation: Quat,
    position: Vec3,
    velocity: Vec3,
    in_air: bool,
}

impl Default for PoseHold {
    fn default() -> Self {
        Self {
            mask: FusionMask::EMPTY,
            orientation: Quat::identity(),
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            in_air: false,
        }
    }
}

impl PoseHold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mask(&self) -> FusionMask {
        self.mask
    }

    /// Last GPS velocity, if GPS velocity fusion is enabled.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn in_air(&self) -> bool {
        self.in_air
    }

    fn latch_position(&mut self, position: Vec3, horizontal: FusionMask, height: FusionMask) {
        if self.mask.contains(horizontal) {
            self.position.x = position.x;
            self.position.y = position.y;
        }
        if self.mask.contains(height) {
            self.position.z = position.z;
        }
    }
}

impl Estimator for PoseHold {
    fn configure(&mut self, mask: FusionMask) {
        self.mask = mask;
    }

    fn ingest_inertial(&mut self, sample: InertialSample) {
        // Non-positive or non-finite dt carries no rotation.
        if !sample.dt.is_finite() || sample.dt <= 0.0 {
            return;
        }
        let delta = Quat::from_scaled_axis(sample.angular_rate * sample.dt);
        self.orientation *= delta;
        self.orientation.renormalize();
    }

    fn ingest_vision(&mut self, pose: VisionPose) {
        if self.mask.contains(FusionMask::VISION_YAW) {
            self.orientation = pose.orientation;
        }
        self.latch_position(
            pose.position,
            FusionMask::VISION_POSITION,
            FusionMask::VISION_HEIGHT,
        );
    }

    fn ingest_gps(&mut self, fix: GpsFix) {
        if self.mask.contains(FusionMask::GPS_VELOCITY) {
            self.velocity = fix.velocity;
        }
        self.latch_position(fix.position, FusionMask::GPS_POSITION, FusionMask::GPS_HEIGHT);
    }

    fn ingest_optical_flow(&mut self, _flow: OpticalFlow) {}

    fn set_ground_contact(&mut self, in_air: bool) {
        self.in_air = in_air;
    }

    fn orientation(&self) -> Quat {
        self.orientation
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}
