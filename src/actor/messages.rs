//! Message types for actor communication.
//!
//! These define the protocol between host threads and the tick thread.

use crate::config::Settings;
use std::time::Duration;

/// Commands marshaled to the tick thread.
///
/// Sent by [`OverlayHandle`](super::OverlayHandle) and applied at the start
/// of the next tick, in send order.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    /// Drop every queued event and live sprite.
    Clear,

    /// Show or hide the overlay.
    SetActive(bool),

    /// Adopt new user settings.
    ApplySettings(Settings),

    /// Switch the active chat session (`None` admits every session).
    SetSession(Option<String>),

    /// The drawing area changed size.
    Resize {
        /// New width in pixels.
        width: f64,
        /// New height in pixels.
        height: f64,
    },
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickStats {
    /// Tick number since the controller was created.
    pub frame_number: u64,
    /// Seconds the sprites were advanced by.
    pub dt: f64,
    /// Sprites created this tick.
    pub spawned: usize,
    /// Sprites retired this tick.
    pub retired: usize,
    /// Sprites alive after the tick.
    pub live: usize,
    /// Events still queued after the tick.
    pub pending: usize,
    /// Whether the tick was skipped (inactive, disabled or zero-sized).
    pub idle: bool,
}

/// Frame timing information reported by the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInfo {
    /// Stats of the most recent tick.
    pub last: TickStats,
    /// Time the last tick took, surface included.
    pub last_tick_time: Duration,
    /// Ticks per second (smoothed).
    pub fps: f32,
}

impl FrameInfo {
    /// Fold in a finished tick.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn record(&mut self, stats: TickStats, tick_time: Duration, since_last: Duration) {
        self.last = stats;
        self.last_tick_time = tick_time;
        let secs = since_last.as_secs_f64();
        if secs > 0.0 {
            let instant = (1.0 / secs) as f32;
            self.fps = if self.fps == 0.0 {
                instant
            } else {
                self.fps.mul_add(0.9, instant * 0.1)
            };
        }
    }
}
