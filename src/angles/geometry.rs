use std::f64::consts::PI;

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::snapshot::AngleResult;

/// Depth proxy divisor applied after scaling z by the image width
pub const DEFAULT_Z_SCALE: f64 = 2.5;
/// A point must be strictly above this to take part in an angle
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.5;

/// A landmark projected into image space.
///
/// `x`, `y` are pixels, `z` is the scaled depth proxy and `visibility` is the
/// detector's confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    fn in_plane(&self, plane: Plane) -> Vector2<f64> {
        match plane {
            Plane::XY => Vector2::new(self.x, self.y),
            Plane::XZ => Vector2::new(self.x, self.z),
            Plane::YZ => Vector2::new(self.y, self.z),
        }
    }
}

/// Projection plane for 2D angles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    XY,
    XZ,
    YZ,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    ThreeD,
    TwoD(Plane),
}

/// Map a normalized landmark to image space.
///
/// x -> x * width, y -> y * height, z -> z * width / z_scale
pub fn project(x: f64, y: f64, z: f64, width: u32, height: u32, z_scale: f64) -> (f64, f64, f64) {
    let w = width as f64;
    let h = height as f64;
    (x * w, y * h, z * w / z_scale)
}

/// All points strictly above the threshold
pub fn all_visible(points: &[Point3D], threshold: f64) -> bool {
    points.iter().all(|p| p.visibility > threshold)
}

/// Angle at vertex `p2` of the triangle `p1, p2, p3`.
///
/// Returns `None` when any point is at or below `visibility_threshold`, or
/// when one of the rays from the vertex has zero length.
pub fn angle(
    p1: &Point3D,
    p2: &Point3D,
    p3: &Point3D,
    dimension: Dimension,
    visibility_threshold: f64,
) -> Option<AngleResult> {
    if !all_visible(&[*p1, *p2, *p3], visibility_threshold) {
        return None;
    }

    let degree = match dimension {
        Dimension::ThreeD => angle_3d(p1, p2, p3)?,
        Dimension::TwoD(plane) => angle_2d(p1, p2, p3, plane)?.to_degrees(),
    };

    Some(AngleResult::from_degrees(degree))
}

/// Unsigned angle in degrees, 0..=180
fn angle_3d(a: &Point3D, b: &Point3D, c: &Point3D) -> Option<f64> {
    let ba = a.position() - b.position();
    let bc = c.position() - b.position();

    let norms = ba.norm() * bc.norm();
    if norms == 0.0 || !norms.is_finite() {
        return None;
    }

    // atan2 stays exact next to 0 and 180 where acos loses digits
    Some(ba.cross(&bc).norm().atan2(ba.dot(&bc)).to_degrees())
}

/// Signed angle in radians between the rays b->c and b->a.
///
/// Differences above pi are folded as `2*pi - value`; differences below -pi
/// are left as they are.
fn angle_2d(a: &Point3D, b: &Point3D, c: &Point3D, plane: Plane) -> Option<f64> {
    let ba = a.in_plane(plane) - b.in_plane(plane);
    let bc = c.in_plane(plane) - b.in_plane(plane);
    if ba.norm() == 0.0 || bc.norm() == 0.0 {
        return None;
    }

    let mut radian = bc.y.atan2(bc.x) - ba.y.atan2(ba.x);
    if radian > PI {
        radian = 2.0 * PI - radian;
    }
    Some(radian)
}
