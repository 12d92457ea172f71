use super::filter::Side;
use super::geometry::{angle, Dimension};
use super::snapshot::{AngleResult, JointField};
use crate::pose::{BodyLandmark, LandmarkFrame};

/// Shoulder, elbow, wrist for one arm; the elbow is the vertex.
pub fn joint_triplet(side: Side) -> Option<[BodyLandmark; 3]> {
    match side {
        Side::Left => Some([
            BodyLandmark::LeftShoulder,
            BodyLandmark::LeftElbow,
            BodyLandmark::LeftWrist,
        ]),
        Side::Right => Some([
            BodyLandmark::RightShoulder,
            BodyLandmark::RightElbow,
            BodyLandmark::RightWrist,
        ]),
        _ => None,
    }
}

pub fn snapshot_field(side: Side) -> Option<JointField> {
    match side {
        Side::Left => Some(JointField::LeftElbowRoll),
        Side::Right => Some(JointField::RightElbowRoll),
        _ => None,
    }
}

/// Raw (unfiltered) 3D elbow angle for one arm.
pub fn elbow_roll(frame: &LandmarkFrame, side: Side, z_scale: f64, threshold: f64) -> Option<AngleResult> {
    let [shoulder, elbow, wrist] = joint_triplet(side)?;
    let p1 = frame.body_point(shoulder, z_scale)?;
    let p2 = frame.body_point(elbow, z_scale)?;
    let p3 = frame.body_point(wrist, z_scale)?;
    angle(&p1, &p2, &p3, Dimension::ThreeD, threshold)
}
