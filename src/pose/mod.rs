pub mod keypoint;
pub mod source;

pub use keypoint::{BodyLandmark, FaceLandmark, Landmark, LandmarkFrame};
pub use source::{JsonLinesSource, KeypointSource};
