use serde::{Deserialize, Serialize};

/// An angle carried in both units. Always built through `from_degrees` or
/// `from_radians` so the pair stays consistent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleResult {
    #[serde(rename = "Degree")]
    pub degree: f64,
    #[serde(rename = "Radian")]
    pub radian: f64,
}

impl AngleResult {
    pub fn from_degrees(degree: f64) -> Self {
        Self {
            degree,
            radian: degree.to_radians(),
        }
    }

    pub fn from_radians(radian: f64) -> Self {
        Self {
            degree: radian.to_degrees(),
            radian,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadAngles {
    #[serde(rename = "Pitch", default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<AngleResult>,
    #[serde(rename = "Roll", default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<AngleResult>,
    #[serde(rename = "Yaw", default, skip_serializing_if = "Option::is_none")]
    pub yaw: Option<AngleResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElbowAngle {
    #[serde(rename = "Roll", default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<AngleResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElbowAngles {
    #[serde(rename = "Left", default)]
    pub left: ElbowAngle,
    #[serde(rename = "Right", default)]
    pub right: ElbowAngle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Angles {
    #[serde(rename = "Head", default)]
    pub head: HeadAngles,
    #[serde(rename = "Elbows", default)]
    pub elbows: ElbowAngles,
}

/// One frame's joint angles, serialized as `{"Angles": {"Head": .., "Elbows": ..}}`.
/// Unknown fields are omitted from the JSON rather than written as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AngleSnapshot {
    #[serde(rename = "Angles", default)]
    pub angles: Angles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointGroup {
    Head,
    Elbows,
}

/// Every field the snapshot schema knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointField {
    HeadPitch,
    HeadRoll,
    HeadYaw,
    LeftElbowRoll,
    RightElbowRoll,
}

impl JointField {
    pub fn group(&self) -> JointGroup {
        match self {
            Self::HeadPitch | Self::HeadRoll | Self::HeadYaw => JointGroup::Head,
            Self::LeftElbowRoll | Self::RightElbowRoll => JointGroup::Elbows,
        }
    }
}

impl AngleSnapshot {
    fn slot_mut(&mut self, field: JointField) -> &mut Option<AngleResult> {
        match field {
            JointField::HeadPitch => &mut self.angles.head.pitch,
            JointField::HeadRoll => &mut self.angles.head.roll,
            JointField::HeadYaw => &mut self.angles.head.yaw,
            JointField::LeftElbowRoll => &mut self.angles.elbows.left.roll,
            JointField::RightElbowRoll => &mut self.angles.elbows.right.roll,
        }
    }

    pub fn get(&self, field: JointField) -> Option<AngleResult> {
        match field {
            JointField::HeadPitch => self.angles.head.pitch,
            JointField::HeadRoll => self.angles.head.roll,
            JointField::HeadYaw => self.angles.head.yaw,
            JointField::LeftElbowRoll => self.angles.elbows.left.roll,
            JointField::RightElbowRoll => self.angles.elbows.right.roll,
        }
    }
}

/// Owns the running snapshot for one pipeline instance.
///
/// Fields keep their last value across frames. An update with `None` leaves
/// the previous value in place.
#[derive(Debug, Clone)]
pub struct AngleAggregator {
    current: AngleSnapshot,
}

impl AngleAggregator {
    pub fn new() -> Self {
        Self {
            current: AngleSnapshot::default(),
        }
    }

    /// Start from the resting pose the robot side expects before the first
    /// detection: both elbows straight (180 degrees), head unknown.
    pub fn with_resting_pose() -> Self {
        let mut aggregator = Self::new();
        let straight = Some(AngleResult::from_degrees(180.0));
        aggregator.update(JointField::LeftElbowRoll, straight);
        aggregator.update(JointField::RightElbowRoll, straight);
        aggregator
    }

    /// Returns true when the field was overwritten
    pub fn update(&mut self, field: JointField, value: Option<AngleResult>) -> bool {
        match value {
            Some(angle) => {
                *self.current.slot_mut(field) = Some(angle);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> &AngleSnapshot {
        &self.current
    }
}

impl Default for AngleAggregator {
    fn default() -> Self {
        Self::new()
    }
}
