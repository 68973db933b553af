//! Pacing lanes: time-gap based round robin.

use super::Lane;

/// Per-lane last spawn time with a rotating cursor.
#[derive(Debug, Clone)]
pub struct PacingLanes {
    last_start_ms: Vec<Option<u64>>,
    cursor: usize,
    gap_ms: u64,
}

impl PacingLanes {
    /// Create `lane_count` idle lanes.
    pub fn new(lane_count: usize, gap_ms: u64) -> Self {
        Self {
            last_start_ms: vec![None; lane_count.max(1)],
            cursor: 0,
            gap_ms,
        }
    }

    /// Number of lanes.
    pub fn lane_count(&self) -> usize {
        self.last_start_ms.len()
    }

    /// Replace the lanes with `lane_count` idle ones.
    pub fn resize(&mut self, lane_count: usize) {
        self.last_start_ms = vec![None; lane_count.max(1)];
        self.cursor = 0;
    }

    /// Mark every lane idle.
    pub fn reset(&mut self) {
        self.last_start_ms.fill(None);
        self.cursor = 0;
    }

    fn is_rested(&self, lane: Lane, now_ms: u64) -> bool {
        self.last_start_ms[lane].is_none_or(|last| now_ms.saturating_sub(last) >= self.gap_ms)
    }

    /// Pick a lane for a spawn at `now_ms` and stamp it.
    ///
    /// The first rested lane from the cursor wins. When every lane spawned
    /// recently, the lane under the cursor is used anyway.
    pub fn pick(&mut self, now_ms: u64) -> Lane {
        let count = self.lane_count();
        let lane = (0..count)
            .map(|i| (self.cursor + i) % count)
            .find(|&lane| self.is_rested(lane, now_ms))
            .unwrap_or(self.cursor % count);

        self.cursor = (lane + 1) % count;
        self.last_start_ms[lane] = Some(now_ms);
        lane
    }
}
