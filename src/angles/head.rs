//! Head orientation from face mesh landmarks.
//!
//! Yaw and pitch come from how far the nose tip sits from the center of the
//! face, measured against the face's own size so the result does not depend
//! on distance to the camera. Roll is the tilt of the line between the outer
//! eye corners.

use nalgebra::Vector2;

use super::geometry::{all_visible, Point3D};
use super::snapshot::AngleResult;
use crate::pose::{FaceLandmark, LandmarkFrame};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadReading {
    pub pitch: Option<AngleResult>,
    pub yaw: Option<AngleResult>,
    pub roll: Option<AngleResult>,
}

fn xy(p: &Point3D) -> Vector2<f64> {
    Vector2::new(p.x, p.y)
}

/// Signed angle of `offset` against a lever of length `half_span`
fn lever_angle(offset: f64, half_span: f64) -> Option<AngleResult> {
    if half_span <= 0.0 || !half_span.is_finite() {
        return None;
    }
    Some(AngleResult::from_radians(offset.atan2(half_span)))
}

/// Positive yaw: nose right of the eye midpoint in the image.
pub fn yaw(nose: &Point3D, left_eye: &Point3D, right_eye: &Point3D, threshold: f64) -> Option<AngleResult> {
    if !all_visible(&[*nose, *left_eye, *right_eye], threshold) {
        return None;
    }
    let mid = (xy(left_eye) + xy(right_eye)) / 2.0;
    let half = (xy(right_eye) - xy(left_eye)).norm() / 2.0;
    lever_angle(nose.x - mid.x, half)
}

/// Positive pitch: nose below the forehead/chin midpoint (looking down).
pub fn pitch(nose: &Point3D, forehead: &Point3D, chin: &Point3D, threshold: f64) -> Option<AngleResult> {
    if !all_visible(&[*nose, *forehead, *chin], threshold) {
        return None;
    }
    let mid = (xy(forehead) + xy(chin)) / 2.0;
    let half = (xy(chin) - xy(forehead)).norm() / 2.0;
    lever_angle(nose.y - mid.y, half)
}

pub fn roll(left_eye: &Point3D, right_eye: &Point3D, threshold: f64) -> Option<AngleResult> {
    if !all_visible(&[*left_eye, *right_eye], threshold) {
        return None;
    }
    let d = xy(right_eye) - xy(left_eye);
    if d.norm() == 0.0 {
        return None;
    }
    Some(AngleResult::from_radians(d.y.atan2(d.x)))
}

/// All three head angles for a frame; every field is `None` without a face.
pub fn estimate(frame: &LandmarkFrame, z_scale: f64, threshold: f64) -> HeadReading {
    let point = |index| frame.face_point(index, z_scale);
    let (Some(nose), Some(left_eye), Some(right_eye), Some(forehead), Some(chin)) = (
        point(FaceLandmark::NoseTip),
        point(FaceLandmark::LeftEyeOuter),
        point(FaceLandmark::RightEyeOuter),
        point(FaceLandmark::Forehead),
        point(FaceLandmark::Chin),
    ) else {
        return HeadReading::default();
    };

    HeadReading {
        pitch: pitch(&nose, &forehead, &chin, threshold),
        yaw: yaw(&nose, &left_eye, &right_eye, threshold),
        roll: roll(&left_eye, &right_eye, threshold),
    }
}
