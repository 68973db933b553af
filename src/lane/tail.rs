//! Tail lanes: geometry based availability.

use super::Lane;

/// Rightmost sprite edge per lane with a rotating cursor.
///
/// Tails are reloaded from the live sprites at the start of every tick and
/// bumped as sprites spawn within the tick, so two sprites spawned in the
/// same tick never share a lane unless the first has room behind it.
#[derive(Debug, Clone)]
pub struct TailLanes {
    tails: Vec<f64>,
    cursor: usize,
}

impl TailLanes {
    /// Create `lane_count` empty lanes.
    pub fn new(lane_count: usize) -> Self {
        Self {
            tails: vec![f64::NEG_INFINITY; lane_count.max(1)],
            cursor: 0,
        }
    }

    /// Number of lanes.
    pub fn lane_count(&self) -> usize {
        self.tails.len()
    }

    /// Replace the lanes with `lane_count` empty ones.
    pub fn resize(&mut self, lane_count: usize) {
        self.tails = vec![f64::NEG_INFINITY; lane_count.max(1)];
        self.cursor = 0;
    }

    /// Empty every lane.
    pub fn reset(&mut self) {
        self.tails.fill(f64::NEG_INFINITY);
        self.cursor = 0;
    }

    /// Overwrite the tails. Missing entries are treated as empty lanes.
    pub fn load_tails(&mut self, tails: &[f64]) {
        for (lane, slot) in self.tails.iter_mut().enumerate() {
            *slot = tails.get(lane).copied().unwrap_or(f64::NEG_INFINITY);
        }
    }

    /// Current tail of a lane.
    pub fn tail(&self, lane: Lane) -> f64 {
        self.tails.get(lane).copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Set a lane's tail after a spawn.
    pub fn set_tail(&mut self, lane: Lane, tail: f64) {
        if let Some(slot) = self.tails.get_mut(lane) {
            *slot = tail;
        }
    }

    /// Whether any lane's tail is left of `max_tail`.
    pub fn any_available(&self, max_tail: f64) -> bool {
        self.tails.iter().any(|&t| t < max_tail)
    }

    /// First available lane from the cursor; advances the cursor past it.
    pub fn find_available(&mut self, max_tail: f64) -> Option<Lane> {
        let count = self.lane_count();
        let lane = (0..count)
            .map(|i| (self.cursor + i) % count)
            .find(|&lane| self.tails[lane] < max_tail)?;
        self.cursor = (lane + 1) % count;
        Some(lane)
    }
}
