mod footprint;
mod geom;
mod overlay;

pub use geom::Geometries;
pub use overlay::{Intersection, Overlay, PlanarOverlay};
pub(crate) use overlay::group_by_left;
