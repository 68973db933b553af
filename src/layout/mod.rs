//! Layout module: Viewport size and the lane grid derived from it.
//!
//! Geometry is recomputed only when the viewport or the geometry-related
//! settings change. There is no per-sprite layout at render time: a sprite's
//! `y` is fixed by its lane.

mod geometry;
mod viewport;

pub use geometry::LaneGeometry;
pub use viewport::Viewport;
