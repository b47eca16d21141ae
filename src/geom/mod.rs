mod core;
mod mesh;
pub mod revolve;
mod tessellation;

pub use core::{Point3, Transform, Vec3};
pub use mesh::GeomMesh;
pub use tessellation::{CircleTable, TessellationOptions};
