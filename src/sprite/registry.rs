//! Sprite registry: Owner of every live sprite.

use super::measure::TextMeasure;
use super::sprite::{ImageSlot, Sprite, SpriteId};
use crate::config::{LanePolicy, OverlayConfig};
use crate::event::ChatEvent;
use crate::lane::Lane;
use crate::layout::{LaneGeometry, Viewport};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Sprites are retired once their right edge passes this far left of 0.
pub const RETIRE_MARGIN: f64 = 10.0;

/// Frame delta used when the measured one is implausible.
pub const FALLBACK_DT: f64 = 1.0 / 60.0;

/// Largest frame delta applied as-is.
pub const MAX_DT: f64 = 0.2;

/// Clamp a frame delta. Negative, non-finite or oversized gaps (after a
/// pause or a stalled host) become one nominal frame.
pub fn sanitize_dt(dt: f64) -> f64 {
    if dt.is_finite() && (0.0..=MAX_DT).contains(&dt) {
        dt
    } else {
        FALLBACK_DT
    }
}

/// How long a sprite should take to cross the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TravelTime {
    /// Uniformly random in `[min, max)` seconds, independent of length.
    Random {
        /// Lower bound in seconds.
        min: f64,
        /// Upper bound in seconds.
        max: f64,
    },
    /// `distance / speed`, clamped to `[min, max]` seconds.
    Distance {
        /// Nominal speed in pixels per second.
        speed_px_per_sec: f64,
        /// Lower bound in seconds.
        min: f64,
        /// Upper bound in seconds.
        max: f64,
    },
}

impl TravelTime {
    /// Travel time matching a lane policy.
    pub const fn for_policy(policy: LanePolicy, pacing_speed_px_per_sec: f64) -> Self {
        match policy {
            LanePolicy::TailGeometry => Self::Random { min: 8.0, max: 10.0 },
            LanePolicy::Pacing => Self::Distance {
                speed_px_per_sec: pacing_speed_px_per_sec,
                min: 4.0,
                max: 12.0,
            },
        }
    }

    fn seconds(self, distance: f64, rng: &mut SmallRng) -> f64 {
        match self {
            Self::Random { min, max } => {
                if max > min {
                    rng.random_range(min..max)
                } else {
                    min
                }
            }
            Self::Distance {
                speed_px_per_sec,
                min,
                max,
            } => {
                if speed_px_per_sec > 0.0 {
                    (distance / speed_px_per_sec).clamp(min, max)
                } else {
                    max
                }
            }
        }
    }
}

/// Live sprites, advanced and retired by the tick loop.
pub struct SpriteRegistry {
    sprites: Vec<Sprite>,
    next_id: u64,
    measure: Box<dyn TextMeasure>,
    rng: SmallRng,
    min_width: f64,
    image_spacing: f64,
    travel_margin: f64,
    travel: TravelTime,
}

impl std::fmt::Debug for SpriteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteRegistry")
            .field("live", &self.sprites.len())
            .field("next_id", &self.next_id)
            .field("travel", &self.travel)
            .finish_non_exhaustive()
    }
}

impl SpriteRegistry {
    /// Create an empty registry.
    pub fn new(config: &OverlayConfig, measure: Box<dyn TextMeasure>) -> Self {
        let rng = config
            .rng_seed
            .map_or_else(|| SmallRng::from_rng(&mut rand::rng()), SmallRng::seed_from_u64);
        Self {
            sprites: Vec::new(),
            next_id: 1,
            measure,
            rng,
            min_width: config.min_sprite_width,
            image_spacing: config.image_spacing_px,
            travel_margin: config.travel_margin_px,
            travel: TravelTime::for_policy(config.lane_policy, config.pacing_speed_px_per_sec),
        }
    }

    /// Override the travel time rule.
    pub const fn set_travel_time(&mut self, travel: TravelTime) {
        self.travel = travel;
    }

    /// Width a sprite for `text` (and optionally an emote) would have.
    pub fn measure(&self, text: &str, has_image: bool, geometry: &LaneGeometry) -> f64 {
        let mut width = if text.is_empty() {
            0.0
        } else {
            self.measure.measure(text, geometry.font_px).max(0.0)
        };
        if has_image {
            if width > 0.0 {
                width += self.image_spacing;
            }
            width += geometry.image_px;
        }
        if width.is_finite() {
            width.max(self.min_width)
        } else {
            self.min_width
        }
    }

    /// Create a sprite for `event` at the right edge of `lane`.
    pub fn spawn(
        &mut self,
        event: &ChatEvent,
        lane: Lane,
        geometry: &LaneGeometry,
        viewport: Viewport,
    ) -> &Sprite {
        let text = event.display_text().to_string();
        let has_image = event.image_url.is_some();
        let width = self.measure(&text, has_image, geometry);

        let distance = viewport.width + width + self.travel_margin;
        let duration = self.travel.seconds(distance, &mut self.rng).max(1.0);

        let id = SpriteId(self.next_id);
        self.next_id += 1;

        tracing::trace!(id = id.0, lane, width, duration, "spawn sprite");

        self.sprites.push(Sprite {
            id,
            lane,
            x: viewport.spawn_x(),
            y: geometry.lane_y(lane),
            width,
            speed_px_per_sec: distance / duration,
            text,
            font_px: geometry.font_px,
            image: if has_image {
                ImageSlot::Pending
            } else {
                ImageSlot::None
            },
        });
        &self.sprites[self.sprites.len() - 1]
    }

    /// Move every sprite left by `speed * dt` and retire those off-screen.
    ///
    /// Returns the number of retired sprites.
    pub fn advance(&mut self, dt: f64) -> usize {
        let dt = sanitize_dt(dt);
        let before = self.sprites.len();
        self.sprites.retain_mut(|s| {
            s.x -= s.speed_px_per_sec * dt;
            !s.is_offscreen(RETIRE_MARGIN)
        });
        before - self.sprites.len()
    }

    /// Rightmost edge per lane; `-inf` for empty lanes.
    pub fn lane_tails(&self, lane_count: usize) -> Vec<f64> {
        let mut tails = vec![f64::NEG_INFINITY; lane_count];
        for s in &self.sprites {
            if let Some(tail) = tails.get_mut(s.lane) {
                *tail = tail.max(s.right());
            }
        }
        tails
    }

    /// Replace a sprite's emote state. Returns `false` if it is gone.
    pub fn attach_image(&mut self, id: SpriteId, slot: ImageSlot) -> bool {
        match self.sprites.iter_mut().find(|s| s.id == id) {
            Some(sprite) if sprite.image.has_image() => {
                sprite.image = slot;
                true
            }
            _ => false,
        }
    }

    /// Look a sprite up.
    pub fn get(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.id == id)
    }

    /// Iterate live sprites in spawn order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sprite> {
        self.sprites.iter()
    }

    /// Live sprites as a slice.
    pub fn as_slice(&self) -> &[Sprite] {
        &self.sprites
    }

    /// Number of live sprites.
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Whether nothing is on screen.
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Drop every sprite.
    pub fn clear(&mut self) {
        self.sprites.clear();
    }

    #[cfg(test)]
    pub(crate) fn push_for_test(&mut self, sprite: Sprite) {
        self.sprites.push(sprite);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::sprite::UnicodeWidthMeasure;

    fn setup(policy: LanePolicy) -> (SpriteRegistry, LaneGeometry, Viewport) {
        let config = OverlayConfig {
            lane_policy: policy,
            rng_seed: Some(7),
            ..OverlayConfig::default()
        };
        let vp = Viewport::new(640.0, 360.0);
        let geometry = LaneGeometry::compute(vp, &Settings::default(), &config);
        let measure = UnicodeWidthMeasure { advance: 0.5 };
        (SpriteRegistry::new(&config, Box::new(measure)), geometry, vp)
    }

    #[test]
    fn test_sanitize_dt() {
        assert!((sanitize_dt(0.016) - 0.016).abs() < f64::EPSILON);
        assert!((sanitize_dt(0.2) - 0.2).abs() < f64::EPSILON);
        assert!((sanitize_dt(0.5) - FALLBACK_DT).abs() < f64::EPSILON);
        assert!((sanitize_dt(-0.1) - FALLBACK_DT).abs() < f64::EPSILON);
        assert!((sanitize_dt(f64::NAN) - FALLBACK_DT).abs() < f64::EPSILON);
        assert!(sanitize_dt(0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_spawn_position_and_random_duration() {
        let (mut reg, g, vp) = setup(LanePolicy::TailGeometry);
        let ev = ChatEvent::new("s", "a", "hello world hello world");
        let s = reg.spawn(&ev, 2, &g, vp).clone();
        assert!((s.x - 650.0).abs() < 1e-9);
        assert!((s.y - g.lane_y(2)).abs() < 1e-9);
        // 23 columns * 20px * 0.5
        assert!((s.width - 230.0).abs() < 1e-9);
        let duration = (640.0 + s.width + 60.0) / s.speed_px_per_sec;
        assert!((8.0..10.0).contains(&duration), "duration {duration}");
        assert!(!s.image.has_image());
    }

    #[test]
    fn test_min_width_and_image_glyph() {
        let (mut reg, g, vp) = setup(LanePolicy::TailGeometry);
        let short = reg.spawn(&ChatEvent::new("s", "a", "x"), 0, &g, vp).width;
        assert!((short - 60.0).abs() < 1e-9);

        let img = ChatEvent::new("s", "a", "[image]").with_image("http://e/1.png", None);
        let s = reg.spawn(&img, 0, &g, vp).clone();
        assert_eq!(s.text, "");
        assert!(matches!(s.image, ImageSlot::Pending));
        assert!((s.width - 60.0).abs() < 1e-9);

        let captioned = ChatEvent::new("s", "a", "abcdefghij").with_image("http://e/1.png", None);
        let w = reg.spawn(&captioned, 0, &g, vp).width;
        // 100 text + 6 spacing + 28 glyph
        assert!((w - 134.0).abs() < 1e-9);
    }

    #[test]
    fn test_reported_image_width_ignored() {
        let (mut reg, g, vp) = setup(LanePolicy::TailGeometry);
        let wide = ChatEvent::new("s", "a", "abcdefghij").with_image("http://e/1.png", Some(80));
        let narrow = ChatEvent::new("s", "a", "abcdefghij").with_image("http://e/1.png", Some(18));
        let w1 = reg.spawn(&wide, 0, &g, vp).width;
        let w2 = reg.spawn(&narrow, 1, &g, vp).width;
        assert!((w1 - 134.0).abs() < 1e-9);
        assert!((w1 - w2).abs() < 1e-9);
    }

    #[test]
    fn test_pacing_duration_is_distance_based() {
        let (mut reg, g, vp) = setup(LanePolicy::Pacing);
        let s = reg.spawn(&ChatEvent::new("s", "a", "hey"), 0, &g, vp).clone();
        // distance 640 + 60 + 60 = 760 -> 4.75 s at 160 px/s
        let distance = 640.0 + s.width + 60.0;
        assert!((distance / s.speed_px_per_sec - 4.75).abs() < 1e-9);

        let long = "x".repeat(400);
        let s = reg.spawn(&ChatEvent::new("s", "a", long), 0, &g, vp).clone();
        let distance = 640.0 + s.width + 60.0;
        assert!((distance / s.speed_px_per_sec - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_retirement_time() {
        let (mut reg, _, _) = setup(LanePolicy::TailGeometry);
        let width = 90.0;
        let speed = 100.0;
        reg.push_for_test(Sprite {
            id: SpriteId(99),
            lane: 0,
            x: 650.0,
            y: 10.0,
            width,
            speed_px_per_sec: speed,
            text: "t".to_string(),
            font_px: 20.0,
            image: ImageSlot::None,
        });
        // x(t) = 650 - 100 t reaches -10 - 90 = -100 at t = 7.5 s.
        let mut elapsed = 0.0;
        let dt = 0.1;
        while reg.len() == 1 {
            let x = reg.as_slice()[0].x;
            assert!(x + width >= -RETIRE_MARGIN - 1e-9, "retired late");
            reg.advance(dt);
            elapsed += dt;
            assert!(elapsed < 10.0);
        }
        assert!(elapsed >= 7.5 - 1e-6, "retired early at {elapsed}");
        assert!(elapsed <= 7.5 + dt + 1e-6, "retired late at {elapsed}");
    }

    #[test]
    fn test_lane_tails() {
        let (mut reg, g, vp) = setup(LanePolicy::TailGeometry);
        reg.spawn(&ChatEvent::new("s", "a", "one"), 1, &g, vp);
        reg.advance(0.1);
        let second = reg.spawn(&ChatEvent::new("s", "a", "two"), 1, &g, vp).right();
        let tails = reg.lane_tails(3);
        assert_eq!(tails[0], f64::NEG_INFINITY);
        assert!((tails[1] - second).abs() < 1e-9);
        assert_eq!(tails[2], f64::NEG_INFINITY);
    }

    #[test]
    fn test_attach_only_to_live_image_sprites() {
        let (mut reg, g, vp) = setup(LanePolicy::TailGeometry);
        let text_id = reg.spawn(&ChatEvent::new("s", "a", "plain"), 0, &g, vp).id;
        let img_id = reg
            .spawn(&ChatEvent::new("s", "a", "").with_image("u", None), 1, &g, vp)
            .id;
        assert!(!reg.attach_image(text_id, ImageSlot::Failed));
        assert!(reg.attach_image(img_id, ImageSlot::Failed));
        assert!(matches!(reg.get(img_id).unwrap().image, ImageSlot::Failed));
        reg.clear();
        assert!(!reg.attach_image(img_id, ImageSlot::Failed));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let (mut reg, g, vp) = setup(LanePolicy::TailGeometry);
        let a = reg.spawn(&ChatEvent::new("s", "a", "1"), 0, &g, vp).id;
        let b = reg.spawn(&ChatEvent::new("s", "a", "2"), 0, &g, vp).id;
        assert_ne!(a, b);
    }
}
