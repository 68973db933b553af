//! Configuration: host-supplied settings and engine tuning.
//!
//! [`Settings`] is the user-facing snapshot owned by the host (toggles and
//! sliders). [`OverlayConfig`] holds the engine constants that a host
//! normally leaves at their defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How much of the viewport height the overlay may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AreaMode {
    /// Top quarter.
    Quarter,
    /// Top half.
    Half,
    /// Top three quarters.
    ThreeQuarter,
    /// Whole viewport.
    #[default]
    Full,
}

impl AreaMode {
    /// Fraction of the viewport height.
    pub const fn ratio(self) -> f64 {
        match self {
            Self::Quarter => 0.25,
            Self::Half => 0.5,
            Self::ThreeQuarter => 0.75,
            Self::Full => 1.0,
        }
    }
}

/// User-facing overlay settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Whether the overlay is shown at all.
    pub enabled: bool,
    /// Overlay opacity in `[0, 1]`.
    pub opacity: f64,
    /// Text scale in `[0.5, 2.0]`.
    pub font_scale: f64,
    /// Spawn density in `[0, 1]`.
    pub density: f64,
    /// Vertical area used for lanes.
    pub area: AreaMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: 1.0,
            font_scale: 1.0,
            density: 1.0,
            area: AreaMode::Full,
        }
    }
}

impl Settings {
    /// Smallest accepted font scale.
    pub const MIN_FONT_SCALE: f64 = 0.5;
    /// Largest accepted font scale.
    pub const MAX_FONT_SCALE: f64 = 2.0;

    /// Clamp every field into its valid range.
    ///
    /// Non-finite values fall back to `1.0`.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            enabled: self.enabled,
            opacity: clamp01(self.opacity),
            font_scale: if self.font_scale.is_finite() {
                self.font_scale
                    .clamp(Self::MIN_FONT_SCALE, Self::MAX_FONT_SCALE)
            } else {
                1.0
            },
            density: clamp01(self.density),
            area: self.area,
        }
    }

    /// Maximum number of sprites that may spawn in one tick.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_spawn_per_tick(&self) -> usize {
        let budget = (clamp01(self.density) * 6.0).round();
        budget.clamp(0.0, 6.0) as usize
    }

    /// Whether switching from `self` to `next` invalidates lane geometry.
    pub fn geometry_differs(&self, next: &Self) -> bool {
        self.area != next.area || (self.font_scale - next.font_scale).abs() > 0.001
    }
}

fn clamp01(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Lane assignment strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LanePolicy {
    /// Time-based pacing: a lane is free again `lane_gap_ms` after its last
    /// spawn. Never blocks.
    Pacing,
    /// Geometry-based: a lane is free once its rightmost sprite has cleared
    /// the spawn edge by `gap_px`. Collision free.
    #[default]
    TailGeometry,
}

/// Queue and dedup bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestLimits {
    /// Identical events inside this window are dropped.
    pub dedupe_window_ms: u64,
    /// Queue length that triggers shedding.
    pub queue_high_water: usize,
    /// Number of newest events kept after shedding.
    pub queue_keep: usize,
    /// Dedup map size that triggers a full reset of the map.
    pub dedup_capacity: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            dedupe_window_ms: 80,
            queue_high_water: 1200,
            queue_keep: 200,
            dedup_capacity: 2000,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Tick period (about 60 FPS).
    pub tick_interval: Duration,
    /// Lane assignment strategy.
    pub lane_policy: LanePolicy,
    /// Font size at scale 1.0, in pixels.
    pub base_font_px: f64,
    /// Lane height at scale 1.0, in pixels.
    pub base_lane_height: f64,
    /// Horizontal gap between sprites in a lane at scale 1.0.
    pub base_gap_px: f64,
    /// Emote square edge at scale 1.0.
    pub base_image_px: f64,
    /// Space between text and emote.
    pub image_spacing_px: f64,
    /// Narrowest sprite width.
    pub min_sprite_width: f64,
    /// Padding above the first lane.
    pub top_pad: f64,
    /// Padding below the last lane.
    pub bottom_pad: f64,
    /// Upper bound for the lane count.
    pub max_lanes: usize,
    /// Pacing policy: minimum time between spawns in one lane.
    pub lane_gap_ms: u64,
    /// Pacing policy: travel speed used to derive durations.
    pub pacing_speed_px_per_sec: f64,
    /// Extra travel distance added when computing speed.
    pub travel_margin_px: f64,
    /// Queue and dedup bounds.
    pub ingest: IngestLimits,
    /// Concurrent emote fetches.
    pub fetch_concurrency: usize,
    /// Decoded emotes kept in the URL cache.
    pub image_cache_capacity: usize,
    /// Fixed RNG seed for reproducible durations.
    pub rng_seed: Option<u64>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16),
            lane_policy: LanePolicy::TailGeometry,
            base_font_px: 20.0,
            base_lane_height: 32.0,
            base_gap_px: 40.0,
            base_image_px: 28.0,
            image_spacing_px: 6.0,
            min_sprite_width: 60.0,
            top_pad: 10.0,
            bottom_pad: 10.0,
            max_lanes: 24,
            lane_gap_ms: 520,
            pacing_speed_px_per_sec: 160.0,
            travel_margin_px: 60.0,
            ingest: IngestLimits::default(),
            fetch_concurrency: 4,
            image_cache_capacity: 512,
            rng_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_ranges() {
        let s = Settings {
            enabled: true,
            opacity: 1.7,
            font_scale: 9.0,
            density: -3.0,
            area: AreaMode::Half,
        }
        .sanitized();
        assert!((s.opacity - 1.0).abs() < f64::EPSILON);
        assert!((s.font_scale - 2.0).abs() < f64::EPSILON);
        assert!(s.density.abs() < f64::EPSILON);
    }

    #[test]
    fn test_sanitize_non_finite() {
        let s = Settings {
            opacity: f64::NAN,
            font_scale: f64::INFINITY,
            density: f64::NAN,
            ..Settings::default()
        }
        .sanitized();
        assert!((s.opacity - 1.0).abs() < f64::EPSILON);
        assert!((s.font_scale - 1.0).abs() < f64::EPSILON);
        assert!((s.density - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_spawn_budget_from_density() {
        let mut s = Settings::default();
        s.density = 0.0;
        assert_eq!(s.max_spawn_per_tick(), 0);
        s.density = 0.5;
        assert_eq!(s.max_spawn_per_tick(), 3);
        s.density = 1.0;
        assert_eq!(s.max_spawn_per_tick(), 6);
        s.density = 0.07;
        assert_eq!(s.max_spawn_per_tick(), 0);
    }

    #[test]
    fn test_geometry_differs() {
        let a = Settings::default();
        let mut b = a;
        b.opacity = 0.3;
        b.density = 0.1;
        assert!(!a.geometry_differs(&b));
        b.font_scale = 1.0005;
        assert!(!a.geometry_differs(&b));
        b.font_scale = 1.2;
        assert!(a.geometry_differs(&b));
        let mut c = a;
        c.area = AreaMode::Quarter;
        assert!(a.geometry_differs(&c));
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"area":"threeQuarter","density":0.25}"#).unwrap();
        assert_eq!(s.area, AreaMode::ThreeQuarter);
        assert!(s.enabled);
        assert!((s.density - 0.25).abs() < f64::EPSILON);
    }
}
