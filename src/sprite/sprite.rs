//! Sprite: One chat message in flight across the viewport.

use crate::asset::DecodedImage;
use crate::lane::Lane;
use std::sync::Arc;

/// Unique identifier for a sprite, never reused within a controller.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SpriteId(pub u64);

/// Emote attached to a sprite.
#[derive(Debug, Clone, Default)]
pub enum ImageSlot {
    /// Text-only sprite.
    #[default]
    None,
    /// Fetch in flight; the glyph area is reserved but empty.
    Pending,
    /// Decoded and ready to draw.
    Loaded(Arc<DecodedImage>),
    /// Fetch failed; rendered text-only.
    Failed,
}

impl ImageSlot {
    /// Whether the sprite was spawned with an emote.
    pub const fn has_image(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// The decoded image, if loaded.
    pub fn loaded(&self) -> Option<&Arc<DecodedImage>> {
        match self {
            Self::Loaded(img) => Some(img),
            _ => None,
        }
    }
}

/// A moving overlay element.
#[derive(Debug, Clone)]
pub struct Sprite {
    /// Identifier.
    pub id: SpriteId,
    /// Lane the sprite occupies.
    pub lane: Lane,
    /// Left edge, decreasing every tick.
    pub x: f64,
    /// Top edge, fixed by the lane.
    pub y: f64,
    /// Width, fixed at spawn.
    pub width: f64,
    /// Horizontal speed in pixels per second.
    pub speed_px_per_sec: f64,
    /// Text to draw (empty for image-only sprites).
    pub text: String,
    /// Font size used for `text`.
    pub font_px: f64,
    /// Emote state.
    pub image: ImageSlot,
}

impl Sprite {
    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Whether the sprite has fully left the viewport on the left.
    #[inline]
    pub fn is_offscreen(&self, margin: f64) -> bool {
        self.right() < -margin
    }

    /// Horizontal interval `[x, x + width]`.
    #[inline]
    pub fn span(&self) -> (f64, f64) {
        (self.x, self.right())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(x: f64, width: f64) -> Sprite {
        Sprite {
            id: SpriteId(1),
            lane: 0,
            x,
            y: 10.0,
            width,
            speed_px_per_sec: 100.0,
            text: "hi".to_string(),
            font_px: 20.0,
            image: ImageSlot::None,
        }
    }

    #[test]
    fn test_offscreen_threshold() {
        assert!(!sprite(-60.0, 50.0).is_offscreen(10.0));
        assert!(sprite(-60.01, 50.0).is_offscreen(10.0));
    }

    #[test]
    fn test_image_slot_states() {
        assert!(!ImageSlot::None.has_image());
        assert!(ImageSlot::Pending.has_image());
        assert!(ImageSlot::Failed.has_image());
        assert!(ImageSlot::Pending.loaded().is_none());
    }
}
