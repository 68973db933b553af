//! Sprites: Moving overlay elements and the registry that owns them.
//!
//! The registry is owned by the tick thread. It is the only writer of
//! sprite positions, so no locking is needed around geometry.

mod measure;
mod registry;
#[allow(clippy::module_inception)]
mod sprite;

pub use measure::{TextMeasure, UnicodeWidthMeasure};
pub use registry::{sanitize_dt, SpriteRegistry, TravelTime, FALLBACK_DT, MAX_DT, RETIRE_MARGIN};
pub use sprite::{ImageSlot, Sprite, SpriteId};
