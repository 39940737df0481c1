use eskf_dispatch::{
    Estimator, FusionMask, GpsFix, InertialSample, Measurement, OpticalFlow, Quat, Stamp, Vec3,
    VisionPose,
    measurement::GroundContact,
    message::{
        ExtendedStateMsg, Header, ImuMsg, LandedState, OdometryMsg, OpticalFlowMsg, PoseMsg,
        QuaternionMsg, Vector3Msg,
    },
};

/// Estimator double that records every call and reports scripted state.
#[derive(Debug, Clone)]
pub struct RecordingEstimator {
    pub configured: Vec<FusionMask>,
    pub measurements: Vec<Measurement>,
    pub orientation: Quat,
    pub position: Vec3,
}

impl Default for RecordingEstimator {
    fn default() -> Self {
        Self {
            configured: Vec::new(),
            measurements: Vec::new(),
            orientation: Quat::identity(),
            position: Vec3::zeros(),
        }
    }
}

#[allow(dead_code)]
impl RecordingEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An estimator whose belief is fixed to the given pose.
    pub fn scripted(orientation: Quat, position: Vec3) -> Self {
        Self {
            orientation,
            position,
            ..Self::default()
        }
    }

    pub fn inertial(&self) -> Vec<&InertialSample> {
        self.measurements
            .iter()
            .filter_map(|m| match m {
                Measurement::Inertial(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn vision(&self) -> Vec<&VisionPose> {
        self.measurements
            .iter()
            .filter_map(|m| match m {
                Measurement::Vision(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn gps(&self) -> Vec<&GpsFix> {
        self.measurements
            .iter()
            .filter_map(|m| match m {
                Measurement::Gps(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn optical_flow(&self) -> Vec<&OpticalFlow> {
        self.measurements
            .iter()
            .filter_map(|m| match m {
                Measurement::OpticalFlow(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn ground_contact(&self) -> Vec<bool> {
        self.measurements
            .iter()
            .filter_map(|m| match m {
                Measurement::GroundContact(c) => Some(c.in_air),
                _ => None,
            })
            .collect()
    }
}

impl Estimator for RecordingEstimator {
    fn configure(&mut self, mask: FusionMask) {
        self.configured.push(mask);
    }

    fn ingest_inertial(&mut self, sample: InertialSample) {
        self.measurements.push(Measurement::Inertial(sample));
    }

    fn ingest_vision(&mut self, pose: VisionPose) {
        self.measurements.push(Measurement::Vision(pose));
    }

    fn ingest_gps(&mut self, fix: GpsFix) {
        self.measurements.push(Measurement::Gps(fix));
    }

    fn ingest_optical_flow(&mut self, flow: OpticalFlow) {
        self.measurements.push(Measurement::OpticalFlow(flow));
    }

    fn set_ground_contact(&mut self, in_air: bool) {
        self.measurements
            .push(Measurement::GroundContact(GroundContact { in_air }));
    }

    fn orientation(&self) -> Quat {
        self.orientation
    }

    fn position(&self) -> Vec3 {
        self.position
    }
}

#[allow(dead_code)]
fn header(us: u64) -> Header {
    Header::at(Stamp::from_micros(us))
}

#[allow(dead_code)]
pub fn imu_at(us: u64) -> ImuMsg {
    ImuMsg {
        header: header(us),
        angular_velocity: Vector3Msg::new(0.01, 0.02, 0.03),
        linear_acceleration: Vector3Msg::new(0.0, 0.0, 9.81),
    }
}

#[allow(dead_code)]
pub fn vision_at(us: u64) -> PoseMsg {
    PoseMsg {
        header: header(us),
        position: Vector3Msg::new(1.0, 2.0, 3.0),
        orientation: QuaternionMsg::default(),
    }
}

#[allow(dead_code)]
pub fn gps_at(us: u64) -> OdometryMsg {
    OdometryMsg {
        header: header(us),
        position: Vector3Msg::new(10.0, 20.0, 30.0),
        linear_velocity: Vector3Msg::new(0.5, 0.0, -0.1),
    }
}

#[allow(dead_code)]
pub fn flow_at(us: u64) -> OpticalFlowMsg {
    OpticalFlowMsg {
        header: header(us),
        integration_time_us: 10_000,
        integrated_x: 0.25,
        integrated_y: -0.5,
        integrated_xgyro: 0.0,
        integrated_ygyro: 0.125,
        distance: 2.0,
        quality: 255,
    }
}

#[allow(dead_code)]
pub fn landed_at(us: u64, landed_state: LandedState) -> ExtendedStateMsg {
    ExtendedStateMsg {
        header: header(us),
        landed_state,
    }
}
