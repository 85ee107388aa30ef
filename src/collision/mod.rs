//! Simple collision primitives and their volume-preserving merge.

pub use self::combine::combine_collision_shapes;
pub use self::shapes::{CollisionShape, OrientedBox};

mod combine;
mod shapes;
