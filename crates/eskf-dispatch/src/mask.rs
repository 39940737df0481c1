//! Fusion mask selecting which optional sensor channels are fused.
//!
//! The mask is read once at startup. Both the subscription wiring and the
//! estimator configuration are derived from the same stored value, so the
//! set of channels fed to the estimator always matches what it was told to
//! expect.

use crate::channel::Channel;
use eyre::{Result, bail, ensure};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::BitOr};

/// Bit flags for the optional sensor channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MaskSetting", into = "u32")]
pub struct FusionMask(u32);

const FLAG_NAMES: [(&str, FusionMask); 7] = [
    ("vision_position", FusionMask::VISION_POSITION),
    ("vision_yaw", FusionMask::VISION_YAW),
    ("vision_height", FusionMask::VISION_HEIGHT),
    ("gps_position", FusionMask::GPS_POSITION),
    ("gps_velocity", FusionMask::GPS_VELOCITY),
    ("gps_height", FusionMask::GPS_HEIGHT),
    ("optical_flow", FusionMask::OPTICAL_FLOW),
];

impl FusionMask {
    pub const EMPTY: Self = Self(0);
    pub const VISION_POSITION: Self = Self(1 << 0);
    pub const VISION_YAW: Self = Self(1 << 1);
    pub const VISION_HEIGHT: Self = Self(1 << 2);
    pub const GPS_POSITION: Self = Self(1 << 3);
    pub const GPS_VELOCITY: Self = Self(1 << 4);
    pub const GPS_HEIGHT: Self = Self(1 << 5);
    pub const OPTICAL_FLOW: Self = Self(1 << 6);

    /// All vision bits.
    pub const VISION: Self =
        Self(Self::VISION_POSITION.0 | Self::VISION_YAW.0 | Self::VISION_HEIGHT.0);
    /// All GPS bits.
    pub const GPS: Self = Self(Self::GPS_POSITION.0 | Self::GPS_VELOCITY.0 | Self::GPS_HEIGHT.0);
    pub const ALL: Self = Self(Self::VISION.0 | Self::GPS.0 | Self::OPTICAL_FLOW.0);

    /// Create a mask from its integer form, rejecting unknown bits.
    pub fn from_bits(bits: u32) -> Result<Self> {
        let unknown = bits & !Self::ALL.0;
        ensure!(
            unknown == 0,
            "fusion_mask {:#x} has unknown bits {:#x} (valid bits: {:#x})",
            bits,
            unknown,
            Self::ALL.0
        );
        Ok(Self(bits))
    }

    /// Create a mask from flag names such as `vision_position`.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::EMPTY, |mask, name| {
            let name = name.as_ref();
            let Some((_, flag)) = FLAG_NAMES.iter().find(|(n, _)| *n == name) else {
                bail!("Unknown fusion flag: {}", name);
            };
            Ok(mask | *flag)
        })
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn vision_enabled(self) -> bool {
        self.intersects(Self::VISION)
    }

    pub fn gps_enabled(self) -> bool {
        self.intersects(Self::GPS)
    }

    pub fn optical_flow_enabled(self) -> bool {
        self.intersects(Self::OPTICAL_FLOW)
    }

    /// Whether a channel gets a subscription under this mask.
    ///
    /// Inertial and ground-contact channels are always subscribed.
    pub fn subscribes(self, channel: Channel) -> bool {
        match channel {
            Channel::Imu | Channel::GroundContact => true,
            Channel::Vision => self.vision_enabled(),
            Channel::Gps => self.gps_enabled(),
            Channel::OpticalFlow => self.optical_flow_enabled(),
        }
    }

    /// Names of the set flags, lowest bit first.
    pub fn flag_names(self) -> Vec<&'static str> {
        FLAG_NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl Default for FusionMask {
    fn default() -> Self {
        Self::VISION
    }
}

impl BitOr for FusionMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for FusionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x} [{}]", self.0, self.flag_names().join("|"))
    }
}

impl From<FusionMask> for u32 {
    fn from(mask: FusionMask) -> u32 {
        mask.0
    }
}

impl TryFrom<u32> for FusionMask {
    type Error = eyre::Report;

    fn try_from(bits: u32) -> Result<Self> {
        Self::from_bits(bits)
    }
}

/// Accepted configuration forms: a raw integer or a list of flag names.
#[derive(Deserialize)]
#[serde(untagged)]
enum MaskSetting {
    Bits(u32),
    Names(Vec<String>),
}

impl TryFrom<MaskSetting> for FusionMask {
    type Error = eyre::Report;

    fn try_from(setting: MaskSetting) -> Result<Self> {
        match setting {
            MaskSetting::Bits(bits) => Self::from_bits(bits),
            MaskSetting::Names(names) => Self::from_names(names),
        }
    }
}
