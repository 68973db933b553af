//! Overlay handle: the thread-safe face of a controller.

use super::messages::OverlayCommand;
use crate::config::Settings;
use crate::controller::Intake;
use crate::error::EventError;
use crate::event::ChatEvent;
use crate::ingest::IngestOutcome;
use crossbeam_channel::Sender;
use std::sync::Arc;

/// Cloneable, `Send + Sync` handle to a running overlay.
///
/// Every call takes effect on the shared intake (queue, session gate and
/// accept flags) before it returns, so an event enqueued after `clear`,
/// `set_active` or `set_session` is judged by the new state and survives.
/// Sprites, lanes and the viewport belong to the tick thread and follow at
/// the start of its next tick.
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    intake: Arc<Intake>,
    commands: Sender<OverlayCommand>,
}

impl OverlayHandle {
    pub(crate) const fn new(intake: Arc<Intake>, commands: Sender<OverlayCommand>) -> Self {
        Self { intake, commands }
    }

    fn send(&self, command: OverlayCommand) {
        // The tick thread is gone; nothing left to update.
        if self.commands.send(command).is_err() {
            tracing::trace!("overlay command dropped, controller gone");
        }
    }

    /// Offer a chat event.
    pub fn enqueue(&self, event: ChatEvent) -> IngestOutcome {
        self.intake.offer(event)
    }

    /// Parse a JSON chat event and offer it.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed or has no session id.
    pub fn enqueue_json(&self, json: &str) -> Result<IngestOutcome, EventError> {
        Ok(self.enqueue(ChatEvent::from_json(json)?))
    }

    /// Drop everything queued now and everything on screen next tick.
    pub fn clear(&self) {
        self.intake.reset();
        self.send(OverlayCommand::Clear);
    }

    /// Show or hide the overlay. Hiding empties the queue now.
    pub fn set_active(&self, active: bool) {
        self.intake.activate(active);
        self.send(OverlayCommand::SetActive(active));
    }

    /// Adopt new settings.
    pub fn apply_settings(&self, settings: Settings) {
        self.intake.adopt_settings(settings);
        self.send(OverlayCommand::ApplySettings(settings));
    }

    /// Switch the active chat session. Events for the new session are
    /// accepted as soon as this returns.
    pub fn set_session(&self, session_id: Option<String>) {
        self.intake.switch_session(session_id.clone());
        self.send(OverlayCommand::SetSession(session_id));
    }

    /// The drawing area changed size.
    pub fn resize(&self, width: f64, height: f64) {
        self.send(OverlayCommand::Resize { width, height });
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.intake.queue.len()
    }
}
