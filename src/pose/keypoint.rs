use serde::{Deserialize, Serialize};

use crate::angles::geometry::{project, Point3D};

/// Indices into the 33-point body landmark set (only the ones we read)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyLandmark {
    Nose = 0,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
}

impl BodyLandmark {
    pub const COUNT: usize = 33;
}

/// Indices into the 468-point face mesh used for head orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum FaceLandmark {
    NoseTip = 1,
    Forehead = 10,
    LeftEyeOuter = 33,
    Chin = 152,
    RightEyeOuter = 263,
}

impl FaceLandmark {
    pub const COUNT: usize = 468;
}

fn full_visibility() -> f64 {
    1.0
}

/// One detector landmark, normalized to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 0.0..1.0 across the width
    pub x: f64,
    /// 0.0..1.0 down the height
    pub y: f64,
    /// depth relative to the hips, roughly on the x scale
    #[serde(default)]
    pub z: f64,
    /// face mesh points carry no score and count as fully visible
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility > threshold
    }

    /// Project into image space
    pub fn to_point(&self, width: u32, height: u32, z_scale: f64) -> Point3D {
        let (x, y, z) = project(self.x, self.y, self.z, width, height, z_scale);
        Point3D::new(x, y, z, self.visibility)
    }
}

/// Everything the detector produced for one camera frame.
/// A missing set means nothing was found, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub body: Option<Vec<Landmark>>,
    #[serde(default)]
    pub face: Option<Vec<Landmark>>,
}

impl LandmarkFrame {
    pub fn body_point(&self, index: BodyLandmark, z_scale: f64) -> Option<Point3D> {
        let body = self.body.as_ref()?;
        body.get(index as usize)
            .map(|lm| lm.to_point(self.width, self.height, z_scale))
    }

    pub fn face_point(&self, index: FaceLandmark, z_scale: f64) -> Option<Point3D> {
        let face = self.face.as_ref()?;
        face.get(index as usize)
            .map(|lm| lm.to_point(self.width, self.height, z_scale))
    }
}
