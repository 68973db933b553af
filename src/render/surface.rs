//! Render surface trait and frame snapshot.

use crate::asset::DecodedImage;
use crate::layout::Viewport;
use crate::sprite::{ImageSlot, Sprite, SpriteId};
use std::sync::Arc;

/// Snapshot of the overlay for one tick.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Tick counter since the controller was created.
    pub frame_number: u64,
    /// Size of the drawing area.
    pub viewport: Viewport,
    /// Overlay opacity in `[0, 1]`.
    pub opacity: f64,
    /// Whether the overlay should be shown at all.
    pub visible: bool,
    /// Live sprites in spawn order.
    pub sprites: &'a [Sprite],
}

impl<'a> Frame<'a> {
    /// A frame with nothing on it.
    pub const fn blank(frame_number: u64, viewport: Viewport, opacity: f64) -> Self {
        Self {
            frame_number,
            viewport,
            opacity,
            visible: false,
            sprites: &[],
        }
    }

    /// Sprites that intersect the viewport horizontally.
    pub fn visible_sprites(&self) -> impl Iterator<Item = SpriteView<'a>> + '_ {
        let width = self.viewport.width;
        self.sprites
            .iter()
            .filter(move |s| s.x < width && s.right() > 0.0)
            .map(SpriteView::from)
    }
}

/// Render-facing view of a sprite.
#[derive(Debug, Clone, Copy)]
pub struct SpriteView<'a> {
    /// Sprite identifier.
    pub id: SpriteId,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Font size for `text`.
    pub font_px: f64,
    /// Text (empty for image-only sprites).
    pub text: &'a str,
    /// Decoded emote, once loaded.
    pub image: Option<&'a Arc<DecodedImage>>,
    /// Whether space is reserved for an emote.
    pub has_image: bool,
}

impl<'a> From<&'a Sprite> for SpriteView<'a> {
    fn from(s: &'a Sprite) -> Self {
        Self {
            id: s.id,
            x: s.x,
            y: s.y,
            width: s.width,
            font_px: s.font_px,
            text: &s.text,
            image: s.image.loaded(),
            has_image: !matches!(s.image, ImageSlot::None),
        }
    }
}

/// Receives one frame per tick.
pub trait RenderSurface {
    /// Draw `frame`. Called on the tick thread.
    fn present(&mut self, frame: &Frame<'_>);
}

impl<F> RenderSurface for F
where
    F: FnMut(&Frame<'_>),
{
    fn present(&mut self, frame: &Frame<'_>) {
        self(frame);
    }
}

/// Surface that keeps a copy of the last frame. Useful for headless hosts
/// and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    /// Number of frames presented.
    pub frames: u64,
    /// Sprites of the last frame.
    pub last: Vec<Sprite>,
    /// Opacity of the last frame.
    pub last_opacity: f64,
    /// Visibility of the last frame.
    pub last_visible: bool,
}

impl RecordingSurface {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSurface for RecordingSurface {
    fn present(&mut self, frame: &Frame<'_>) {
        self.frames += 1;
        self.last.clear();
        self.last.extend_from_slice(frame.sprites);
        self.last_opacity = frame.opacity;
        self.last_visible = frame.visible;
    }
}
