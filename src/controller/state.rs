//! Controller state and settings diffs.

use crate::config::Settings;
use bitflags::bitflags;

/// Lifecycle of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    /// Not shown. Nothing is queued or spawned.
    Inactive,
    /// Shown and scheduling.
    Active,
    /// Active, but the user switched the overlay off.
    Disabled,
}

impl OverlayState {
    /// Derive the state from the two switches.
    pub const fn from_flags(active: bool, enabled: bool) -> Self {
        match (active, enabled) {
            (false, _) => Self::Inactive,
            (true, true) => Self::Active,
            (true, false) => Self::Disabled,
        }
    }

    /// Whether ticks advance and spawn.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Active)
    }
}

bitflags! {
    /// Which parts of [`Settings`] changed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SettingsChange: u8 {
        /// The overlay was switched on or off.
        const ENABLED = 1 << 0;
        /// Opacity changed.
        const OPACITY = 1 << 1;
        /// Density changed.
        const DENSITY = 1 << 2;
        /// Area or font scale changed; live sprites were dropped.
        const GEOMETRY = 1 << 3;
    }
}

impl SettingsChange {
    /// Diff two sanitized settings.
    pub fn between(old: &Settings, new: &Settings) -> Self {
        let mut change = Self::empty();
        if old.enabled != new.enabled {
            change |= Self::ENABLED;
        }
        if (old.opacity - new.opacity).abs() > f64::EPSILON {
            change |= Self::OPACITY;
        }
        if (old.density - new.density).abs() > f64::EPSILON {
            change |= Self::DENSITY;
        }
        if old.geometry_differs(new) {
            change |= Self::GEOMETRY;
        }
        change
    }
}
