use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ReceiverConfig;

pub const HEAD_PITCH: &str = "HeadPitch";
pub const HEAD_YAW: &str = "HeadYaw";
pub const LEFT_ELBOW_ROLL: &str = "LElbowRoll";
pub const RIGHT_ELBOW_ROLL: &str = "RElbowRoll";

const HEAD_PITCH_PATH: &str = "/Angles/Head/Pitch/Radian";
const HEAD_YAW_PATH: &str = "/Angles/Head/Yaw/Radian";
const LEFT_ELBOW_PATH: &str = "/Angles/Elbows/Left/Roll/Radian";
const RIGHT_ELBOW_PATH: &str = "/Angles/Elbows/Right/Roll/Radian";

/// Valid travel of one joint, in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointRange {
    pub min: f64,
    pub max: f64,
}

impl JointRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Unlike `f64::clamp` this never panics on a misconfigured range
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// One `setAngles` call
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorCommand {
    pub names: Vec<&'static str>,
    pub values: Vec<f64>,
    pub speed: f64,
}

/// Radian value at a JSON pointer. Anything missing, null, non-numeric or
/// non-finite reads as `None`.
pub fn radian_at(message: &Value, pointer: &str) -> Option<f64> {
    message
        .pointer(pointer)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

/// Turns decoded snapshots into actuator commands.
///
/// Joint sign convention:
/// - head pitch is inverted (the robot pitches down for positive values
///   while the vision side reports looking down as positive), yaw passes
///   through;
/// - the elbows are mirrored: the left side takes the inverted angle and is
///   clamped into a negative range, the right side takes the angle as is and
///   is clamped into a positive range.
#[derive(Debug, Clone)]
pub struct JointCommandMapper {
    head_speed: f64,
    elbow_speed: f64,
    min_speed: f64,
    max_speed: f64,
    left_elbow: JointRange,
    right_elbow: JointRange,
}

impl JointCommandMapper {
    pub fn from_config(config: &ReceiverConfig) -> Self {
        Self {
            head_speed: config.head_speed,
            elbow_speed: config.elbow_speed,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            left_elbow: config.left_elbow_range,
            right_elbow: config.right_elbow_range,
        }
    }

    pub fn clamp_speed(&self, speed: f64) -> f64 {
        speed.max(self.min_speed).min(self.max_speed)
    }

    /// `None` unless both pitch and yaw are present
    pub fn head_command(&self, message: &Value) -> Option<ActuatorCommand> {
        let pitch = radian_at(message, HEAD_PITCH_PATH)?;
        let yaw = radian_at(message, HEAD_YAW_PATH)?;
        Some(ActuatorCommand {
            names: vec![HEAD_PITCH, HEAD_YAW],
            values: vec![-pitch, yaw],
            speed: self.clamp_speed(self.head_speed),
        })
    }

    /// `None` unless both elbows are present
    pub fn elbow_command(&self, message: &Value) -> Option<ActuatorCommand> {
        let left = radian_at(message, LEFT_ELBOW_PATH)?;
        let right = radian_at(message, RIGHT_ELBOW_PATH)?;
        Some(ActuatorCommand {
            names: vec![LEFT_ELBOW_ROLL, RIGHT_ELBOW_ROLL],
            values: vec![self.left_elbow.clamp(-left), self.right_elbow.clamp(right)],
            speed: self.clamp_speed(self.elbow_speed),
        })
    }
}

impl Default for JointCommandMapper {
    fn default() -> Self {
        Self::from_config(&ReceiverConfig::default())
    }
}
