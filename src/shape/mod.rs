pub mod drawable;
pub mod geometry;
pub mod registry;

pub use drawable::{Shape, ShapeId, ShapeKind, ShapeTag, SOLID_RESOLUTION};
pub use geometry::{DrawItem, Primitive, Transform, Vertex};
pub use registry::ShapeRegistry;
