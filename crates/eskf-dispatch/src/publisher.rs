//! Fixed-rate pose output.

use crate::{
    estimator::Estimator,
    types::{Covariance, Quat, Vec3},
};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{trace, warn};

/// Default frame id stamped on published poses.
pub const DEFAULT_FRAME_ID: &str = "/pose";

/// Capacity of the pose queue created by [`Publisher::channel`].
pub const POSE_QUEUE_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct PoseHeader {
    /// Publication sequence number, starting at 0.
    pub seq: u64,
    /// Wall-clock time of the publication.
    pub stamp: DateTime<Utc>,
    pub frame_id: String,
}

/// A snapshot of the estimator's belief.
///
/// The covariance is always zero: uncertainty is not propagated downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPose {
    pub header: PoseHeader,
    pub position: Vec3,
    pub orientation: Quat,
    pub covariance: Covariance,
}

pub type PoseReceiver = mpsc::Receiver<OutputPose>;

/// Reads the estimator and emits one [`OutputPose`] per tick.
///
/// Owns the sequence counter, which is never reset. Publication is not
/// gated on the estimator having received any measurement.
///
/// Poses are never buffered beyond the queue's capacity: a pose that does
/// not fit is dropped and counted, and its sequence number is consumed.
#[derive(Debug)]
pub struct Publisher {
    frame_id: String,
    seq: u64,
    dropped: u64,
    tx: mpsc::Sender<OutputPose>,
    full_reported: bool,
    receiver_gone: bool,
}

impl Publisher {
    pub fn new(frame_id: impl Into<String>, tx: mpsc::Sender<OutputPose>) -> Self {
        Self {
            frame_id: frame_id.into(),
            seq: 0,
            dropped: 0,
            tx,
            full_reported: false,
            receiver_gone: false,
        }
    }

    /// Create a publisher together with the receiving end of its output,
    /// holding at most [`POSE_QUEUE_DEPTH`] unread poses.
    pub fn channel(frame_id: impl Into<String>) -> (Self, PoseReceiver) {
        let (tx, rx) = mpsc::channel(POSE_QUEUE_DEPTH);
        (Self::new(frame_id, tx), rx)
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// Sequence number of the next pose.
    pub fn next_seq(&self) -> u64 {
        self.seq
    }

    /// Poses that were published but never reached the receiver.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Build the next pose from the estimator state and advance the counter.
    pub fn snapshot<E>(&mut self, estimator: &E, stamp: DateTime<Utc>) -> OutputPose
    where
        E: Estimator + ?Sized,
    {
        let header = PoseHeader {
            seq: self.seq,
            stamp,
            frame_id: self.frame_id.clone(),
        };
        self.seq += 1;

        OutputPose {
            header,
            position: estimator.position(),
            orientation: estimator.orientation(),
            covariance: Covariance::zeros(),
        }
    }

    /// Timer tick: snapshot the estimator at the current wall time and send.
    ///
    /// Returns the sequence number of the emitted pose. A full queue or a
    /// closed output drops the pose; each condition is reported once.
    pub fn tick<E>(&mut self, estimator: &E) -> u64
    where
        E: Estimator + ?Sized,
    {
        let pose = self.snapshot(estimator, Utc::now());
        let seq = pose.header.seq;
        trace!(seq, position = ?pose.position, "Publishing pose");

        match self.tx.try_send(pose) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if !self.full_reported {
                    self.full_reported = true;
                    warn!(frame_id = %self.frame_id, seq, "Pose receiver is not keeping up; dropping poses");
                }
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped += 1;
                if !self.receiver_gone {
                    self.receiver_gone = true;
                    warn!(frame_id = %self.frame_id, "Pose receiver dropped; poses are discarded");
                }
            }
        }
        seq
    }
}
