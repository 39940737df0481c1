//! Measurement dispatch for an error-state Kalman filter node.
//!
//! Raw sensor messages (inertial, vision pose, GPS odometry, optical flow,
//! landed state) arrive asynchronously through typed [`Subscription`]
//! handles. A single [`Runner`] task converts each message into a typed
//! [`Measurement`], computes the elapsed time since the previous sample on
//! the same channel, and forwards it to an [`Estimator`]. The first sample
//! of every timed channel only seeds its timing and is not forwarded. On a
//! fixed-rate timer the runner reads the estimator's orientation and
//! position and publishes an [`OutputPose`].
//!
//! Which optional channels exist is decided once by the [`FusionMask`]; the
//! same mask value configures the estimator.
//!
//! # Usage
//!
//! ```rust
//! use eskf_dispatch::{
//!     Channel, DispatchConfig, FusionMask, PoseHold, Runner, Stamp,
//!     message::{Header, ImuMsg},
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> eyre::Result<()> {
//! let config = DispatchConfig::new(FusionMask::VISION, 50.0);
//! let (runner, subs, _poses) = Runner::new(config, PoseHold::new())?;
//! let handle = tokio::spawn(runner.run());
//!
//! for us in [0, 5_000, 10_000] {
//!     subs.imu.deliver(ImuMsg {
//!         header: Header::at(Stamp::from_micros(us)),
//!         ..Default::default()
//!     })?;
//! }
//! assert!(subs.vision.is_some());
//! assert!(subs.gps.is_none());
//!
//! // Dropping the handles ends the loop once the queue is drained.
//! drop(subs);
//! let finished = handle.await??;
//! assert_eq!(finished.stats.channel(Channel::Imu).forwarded, 2);
//! # Ok(())
//! # }
//! ```

pub mod channel;
mod config;
pub mod dispatch;
pub mod estimator;
pub mod mask;
pub mod measurement;
pub mod message;
pub mod publisher;
mod runner;
pub mod subscription;
mod types;

pub use channel::{Channel, ChannelState};
pub use config::{DEFAULT_PUBLISH_RATE, DispatchConfig};
pub use dispatch::{ChannelStats, DispatchStats, Dispatcher, Outcome};
pub use estimator::{Estimator, PoseHold};
pub use mask::FusionMask;
pub use measurement::{GpsFix, GroundContact, InertialSample, Measurement, OpticalFlow, VisionPose};
pub use message::SensorEvent;
pub use publisher::{OutputPose, POSE_QUEUE_DEPTH, PoseHeader, PoseReceiver, Publisher};
pub use runner::{Finished, Runner};
pub use subscription::{Subscription, Subscriptions};
pub use types::*;
