//! Intake: state shared between the tick thread and producer threads.

use super::SettingsChange;
use crate::asset::SessionGate;
use crate::clock::Clock;
use crate::config::Settings;
use crate::event::ChatEvent;
use crate::ingest::{IngestOutcome, IngestQueue, Rejected};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Everything a producer thread needs to offer an event.
///
/// Calls that empty the queue (clear, deactivate, disable, a new session)
/// take effect here at call time, so an event offered afterwards always
/// survives. The tick thread only clears what it owns.
pub(crate) struct Intake {
    pub(crate) queue: IngestQueue,
    pub(crate) session: SessionGate,
    pub(crate) clock: Arc<dyn Clock>,
    active: AtomicBool,
    /// Last settings the host asked for.
    settings: Mutex<Settings>,
}

impl std::fmt::Debug for Intake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intake")
            .field("queue", &self.queue)
            .field("session", &self.session)
            .field("active", &self.active)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Intake {
    pub(crate) fn new(queue: IngestQueue, clock: Arc<dyn Clock>, settings: Settings) -> Self {
        Self {
            queue,
            session: SessionGate::new(),
            clock,
            active: AtomicBool::new(false),
            settings: Mutex::new(settings),
        }
    }

    fn enabled(&self) -> bool {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .enabled
    }

    pub(crate) fn accepting(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.enabled()
    }

    /// Empty the queue and its dedup map.
    pub(crate) fn reset(&self) {
        self.queue.clear();
    }

    /// Show or hide. Hiding empties the queue.
    pub(crate) fn activate(&self, active: bool) {
        if active {
            self.active.store(true, Ordering::Release);
        } else {
            self.queue.clear_if(|| {
                self.active.store(false, Ordering::Release);
                true
            });
        }
    }

    /// Record the host's settings. Disabling or a geometry change empties
    /// the queue.
    pub(crate) fn adopt_settings(&self, settings: Settings) -> SettingsChange {
        let next = settings.sanitized();
        let mut change = SettingsChange::empty();
        self.queue.clear_if(|| {
            let mut current = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
            change = SettingsChange::between(&current, &next);
            *current = next;
            !next.enabled || change.contains(SettingsChange::GEOMETRY)
        });
        change
    }

    /// Switch the live session. A change empties the queue under the same
    /// lock that admits events.
    pub(crate) fn switch_session(&self, session_id: Option<String>) -> bool {
        self.queue.clear_if(|| self.session.set(session_id))
    }

    /// Gate and queue an event.
    pub(crate) fn offer(&self, event: ChatEvent) -> IngestOutcome {
        if !self.accepting() {
            return IngestOutcome::Rejected(Rejected::Inactive);
        }
        let now = self.clock.now_ms();
        // Re-checked under the queue lock: a concurrent clear either ran
        // before (and the event is judged by the new state) or runs after.
        self.queue.enqueue_gated(event, now, |event| {
            if !self.accepting() {
                Some(Rejected::Inactive)
            } else if !self.session.admits(&event.session_id) {
                Some(Rejected::StaleSession)
            } else {
                None
            }
        })
    }
}
