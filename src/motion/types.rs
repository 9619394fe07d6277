use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hardware feed exposed by the streaming sensor provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Feed {
    Accelerometer,
    Gyroscope,
    DeviceMotion,
}

impl Feed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Accelerometer => "accelerometer",
            Feed::Gyroscope => "gyroscope",
            Feed::DeviceMotion => "deviceMotion",
        }
    }

    /// Display channels this feed publishes into.
    pub fn channels(&self) -> &'static [Channel] {
        match self {
            Feed::Accelerometer => &[Channel::Accelerometer],
            Feed::Gyroscope => &[Channel::Gyroscope],
            Feed::DeviceMotion => &[Channel::Acceleration, Channel::Rotation],
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named logical data stream with its own display snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Raw accelerometer axes.
    Accelerometer,
    /// Raw gyroscope rotation rate.
    Gyroscope,
    /// Fused user acceleration (gravity removed).
    Acceleration,
    /// Fused rotation rate.
    Rotation,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Accelerometer => "accelerometer",
            Channel::Gyroscope => "gyroscope",
            Channel::Acceleration => "acceleration",
            Channel::Rotation => "rotation",
        }
    }

    pub fn is_fused(&self) -> bool {
        matches!(self, Channel::Acceleration | Channel::Rotation)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One reading from a raw-axis feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub vector: Vector3,
    pub captured_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            vector: Vector3::new(x, y, z),
            captured_at: Utc::now(),
        }
    }
}

/// One reading from the fused device-motion feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MotionSample {
    pub user_acceleration: Vector3,
    pub rotation_rate: Vector3,
    pub captured_at: DateTime<Utc>,
}

impl MotionSample {
    pub fn new(user_acceleration: Vector3, rotation_rate: Vector3) -> Self {
        Self {
            user_acceleration,
            rotation_rate,
            captured_at: Utc::now(),
        }
    }
}

/// What a provider hands to a subscription callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedSample {
    Axis(Sample),
    Motion(MotionSample),
}

/// Whether a source's underlying feed exists on this device.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Availability {
    /// Not probed yet; the source has never been started.
    #[default]
    Unknown,
    Available,
    Unavailable,
}
