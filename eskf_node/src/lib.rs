//! eskf-node - replay node for the eskf-dispatch layer.
//!
//! Feeds a recorded sensor stream through the
//! [eskf-dispatch](../eskf_dispatch/index.html) runner with the
//! [`PoseHold`](eskf_dispatch::PoseHold) estimator, and writes every
//! published pose as a JSON line.
//!
//! # Configuration
//!
//! The node reads a YAML file specifying:
//! - The fusion mask, publish rate and output frame id
//! - The recording to replay and whether to pace it in real time
//! - Where to write poses (standard output by default)
//! - How long to keep publishing after the recording ends
//!
//! See the `config/example.yaml` file for a complete example.

pub mod config;
pub mod node;
pub mod output;
pub mod replay;

pub use config::Config;
pub use node::{EskfNode, RunSummary};
pub use output::PoseRecord;
pub use replay::{Pacing, ReplayStats};
