pub mod elbows;
pub mod filter;
pub mod geometry;
pub mod head;
pub mod snapshot;

pub use filter::{AngleFilter, Side};
pub use geometry::{angle, project, Dimension, Plane, Point3D};
pub use head::HeadReading;
pub use snapshot::{AngleAggregator, AngleResult, AngleSnapshot, JointField, JointGroup};
