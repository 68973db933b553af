//! Lane geometry: How many lanes fit and where they sit.

use super::viewport::Viewport;
use crate::config::{OverlayConfig, Settings};

/// Pre-computed lane grid for one (viewport, settings) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneGeometry {
    /// Number of lanes, at least one.
    pub lane_count: usize,
    /// Height of a lane in pixels.
    pub lane_height: f64,
    /// Font size in pixels.
    pub font_px: f64,
    /// Emote square edge in pixels.
    pub image_px: f64,
    /// Required distance between a lane's tail and the spawn edge.
    pub gap_px: f64,
    /// Y of lane 0.
    pub top_pad: f64,
    /// Right edge at which new sprites enter.
    pub spawn_right_edge: f64,
}

impl LaneGeometry {
    /// Compute the grid. Settings are expected to be sanitized.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn compute(viewport: Viewport, settings: &Settings, config: &OverlayConfig) -> Self {
        let scale = settings.font_scale;
        let lane_height = config.base_lane_height * scale;
        let usable = viewport.height * settings.area.ratio() - config.top_pad - config.bottom_pad;

        let fit = if usable.is_finite() && usable > 0.0 && lane_height > 0.0 {
            (usable / lane_height).floor()
        } else {
            0.0
        };
        let max_lanes = config.max_lanes.max(1);
        let lane_count = (fit.max(0.0).min(max_lanes as f64) as usize).clamp(1, max_lanes);

        Self {
            lane_count,
            lane_height,
            font_px: config.base_font_px * scale,
            image_px: config.base_image_px * scale,
            gap_px: config.base_gap_px * scale,
            top_pad: config.top_pad,
            spawn_right_edge: viewport.spawn_x(),
        }
    }

    /// Y coordinate of a lane's top edge.
    #[allow(clippy::cast_precision_loss)]
    pub fn lane_y(&self, lane: usize) -> f64 {
        self.top_pad + lane as f64 * self.lane_height
    }

    /// Largest tail a lane may have and still accept a new sprite.
    pub fn max_tail(&self) -> f64 {
        self.spawn_right_edge - self.gap_px
    }
}
