//! Various unsorted geometrical and logical operators.

pub use self::center::center;
pub use self::cov::{center_cov, cov};
pub use self::fibonacci::{cardinal_directions, spherical_fibonacci};
pub use self::obb::obb;
pub use self::point_in_poly2d::{point_in_polygons2d, signed_area2d};
pub use self::sorted_pair::SortedPair;
pub use self::spade::{sanitize_spade_coord, sanitize_spade_point};

mod center;
mod cov;
mod fibonacci;
mod obb;
mod point_in_poly2d;
mod sorted_pair;
mod spade;
