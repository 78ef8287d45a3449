//! Foundation types: submap identity, rigid 3D transforms, planar bounds.

mod bounds;
mod submap_id;
mod transform;

pub use bounds::Bounds;
pub use submap_id::SubmapId;
pub use transform::{Quat, Rigid3, Vec3};
