//! Render: The boundary between the engine and whatever draws pixels.
//!
//! The engine never draws. Once per tick it hands the surface a [`Frame`]
//! describing every live sprite; the surface turns that into pixels, a
//! retained scene graph, or terminal cells.

mod surface;

pub use surface::{Frame, RecordingSurface, RenderSurface, SpriteView};
