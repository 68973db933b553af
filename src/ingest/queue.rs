//! Ingest queue: FIFO backlog plus temporal dedup map behind one lock.

use crate::config::IngestLimits;
use crate::event::ChatEvent;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Why an event was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Neither text nor image.
    Empty,
    /// Same key accepted within the dedup window.
    Duplicate,
    /// The overlay is inactive or disabled.
    Inactive,
    /// The event belongs to a session other than the active one.
    StaleSession,
}

/// Result of [`IngestQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Queued.
    Accepted {
        /// Events dropped from the front of the queue to make room.
        shed: usize,
    },
    /// Silently dropped.
    Rejected(Rejected),
}

impl IngestOutcome {
    /// Whether the event made it into the queue.
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

#[derive(Debug, Default)]
struct Inner {
    pending: VecDeque<ChatEvent>,
    /// Dedup key -> time of last acceptance.
    recent: HashMap<String, u64>,
}

/// Pending chat events awaiting a lane.
///
/// All operations take the same lock, so `clear` is atomic with respect to
/// concurrent `enqueue` calls.
#[derive(Debug)]
pub struct IngestQueue {
    inner: Mutex<Inner>,
    limits: IngestLimits,
}

impl IngestQueue {
    /// Create an empty queue.
    pub fn new(limits: IngestLimits) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            limits,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the deque or map in a
        // torn state, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer an event received at `now_ms`.
    pub fn enqueue(&self, event: ChatEvent, now_ms: u64) -> IngestOutcome {
        self.enqueue_gated(event, now_ms, |_| None)
    }

    /// Offer an event, letting `gate` veto it while the queue lock is held.
    ///
    /// State that `gate` reads and [`IngestQueue::clear_if`] writes is
    /// therefore never observed half-switched.
    pub fn enqueue_gated(
        &self,
        event: ChatEvent,
        now_ms: u64,
        gate: impl FnOnce(&ChatEvent) -> Option<Rejected>,
    ) -> IngestOutcome {
        if event.is_blank() {
            return IngestOutcome::Rejected(Rejected::Empty);
        }

        let key = event.dedup_key();
        let mut inner = self.lock();
        if let Some(rejected) = gate(&event) {
            return IngestOutcome::Rejected(rejected);
        }

        if let Some(&last) = inner.recent.get(&key) {
            if now_ms.saturating_sub(last) < self.limits.dedupe_window_ms {
                return IngestOutcome::Rejected(Rejected::Duplicate);
            }
        }
        inner.recent.insert(key, now_ms);
        inner.pending.push_back(event);

        let mut shed = 0;
        if inner.pending.len() > self.limits.queue_high_water {
            shed = inner.pending.len() - self.limits.queue_keep;
            inner.pending.drain(..shed);
            tracing::debug!(shed, kept = inner.pending.len(), "ingest queue overloaded, shedding oldest");
        }

        if inner.recent.len() > self.limits.dedup_capacity {
            tracing::debug!(entries = inner.recent.len(), "dedup map full, resetting");
            inner.recent.clear();
        }

        IngestOutcome::Accepted { shed }
    }

    /// Take the oldest pending event.
    pub fn pop_front(&self) -> Option<ChatEvent> {
        self.lock().pending.pop_front()
    }

    /// Drop events from the front while `stale` holds for them.
    ///
    /// Returns how many were dropped.
    pub fn drop_front_while(&self, mut stale: impl FnMut(&ChatEvent) -> bool) -> usize {
        let mut inner = self.lock();
        let mut dropped = 0;
        while inner.pending.front().is_some_and(&mut stale) {
            inner.pending.pop_front();
            dropped += 1;
        }
        dropped
    }

    /// Empty the queue and the dedup map.
    pub fn clear(&self) {
        self.clear_if(|| true);
    }

    /// Run `f` under the queue lock and, if it returns `true`, empty the
    /// queue and the dedup map before releasing it.
    pub fn clear_if(&self, f: impl FnOnce() -> bool) -> bool {
        let mut inner = self.lock();
        let clear = f();
        if clear {
            inner.pending.clear();
            inner.recent.clear();
        }
        clear
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Number of keys in the dedup map.
    pub fn dedup_len(&self) -> usize {
        self.lock().recent.len()
    }

    /// Configured limits.
    pub const fn limits(&self) -> &IngestLimits {
        &self.limits
    }
}

impl Default for IngestQueue {
    fn default() -> Self {
        Self::new(IngestLimits::default())
    }
}
