//! Session gate: which stream session is currently live.

use std::sync::{Arc, PoisonError, RwLock};

/// Shared, cloneable view of the active session id.
///
/// Written when the host switches rooms; read by the
/// intake path and by fetch tasks to discard stale work.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    active: Arc<RwLock<Option<String>>>,
}

impl SessionGate {
    /// Create a gate with no active session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trim a session id; blank ids mean "no session".
    pub fn normalize(session_id: Option<String>) -> Option<String> {
        session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Set the active session. Returns `true` if it changed.
    pub fn set(&self, session_id: Option<String>) -> bool {
        let next = Self::normalize(session_id);
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if *active == next {
            return false;
        }
        *active = next;
        true
    }

    /// The active session id.
    pub fn current(&self) -> Option<String> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `session_id` is the active session.
    pub fn is_current(&self, session_id: &str) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .is_some_and(|active| active == session_id.trim())
    }

    /// Whether an event from `session_id` may be shown.
    ///
    /// Without an active session every event is admitted.
    pub fn admits(&self, session_id: &str) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .is_none_or(|active| active == session_id.trim())
    }
}
