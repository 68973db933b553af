//! Controller: The overlay's top-level state machine.
//!
//! [`OverlayController`] owns every piece of per-session state and is driven
//! by one thread calling [`OverlayController::tick`]. Other threads talk to it
//! through an [`OverlayHandle`]. Events go straight into the shared ingest
//! queue. Other calls update the shared intake state at once (so the queue
//! is emptied in call order) and are queued as an [`OverlayCommand`] so the
//! tick thread can update what it owns at the start of the next tick.

mod intake;
mod state;

pub(crate) use intake::Intake;
pub use state::{OverlayState, SettingsChange};

use crate::actor::{OverlayCommand, OverlayHandle, TickStats};
use crate::asset::{AssetCompletion, AssetFetchPipeline, ImageTransport, RequestOutcome, SessionGate};
use crate::clock::{Clock, MonotonicClock};
use crate::config::{OverlayConfig, Settings};
use crate::event::ChatEvent;
use crate::ingest::{IngestOutcome, IngestQueue};
use crate::lane::LaneScheduler;
use crate::layout::{LaneGeometry, Viewport};
use crate::render::{Frame, RenderSurface};
use crate::sprite::{sanitize_dt, ImageSlot, SpriteId, SpriteRegistry, TextMeasure, UnicodeWidthMeasure};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Builder for [`OverlayController`].
pub struct OverlayBuilder {
    config: OverlayConfig,
    settings: Settings,
    viewport: Viewport,
    clock: Option<Arc<dyn Clock>>,
    measure: Option<Box<dyn TextMeasure>>,
    transport: Option<(Arc<dyn ImageTransport>, Handle)>,
}

impl std::fmt::Debug for OverlayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayBuilder")
            .field("config", &self.config)
            .field("settings", &self.settings)
            .field("viewport", &self.viewport)
            .field("has_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl OverlayBuilder {
    /// Initial user settings.
    #[must_use]
    pub const fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Initial drawing area.
    #[must_use]
    pub const fn viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    /// Time source for dedup windows, lane pacing and frame deltas.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Text measurement backend.
    #[must_use]
    pub fn measure(mut self, measure: impl TextMeasure + 'static) -> Self {
        self.measure = Some(Box::new(measure));
        self
    }

    /// Enable emote loading through `transport`, with fetch tasks spawned on
    /// `runtime`.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn ImageTransport>, runtime: Handle) -> Self {
        self.transport = Some((transport, runtime));
        self
    }

    /// Build the controller. It starts inactive.
    pub fn build(self) -> OverlayController {
        let settings = self.settings.sanitized();
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let measure = self
            .measure
            .unwrap_or_else(|| Box::new(UnicodeWidthMeasure::default()));

        let intake = Arc::new(Intake::new(
            IngestQueue::new(self.config.ingest),
            clock,
            settings,
        ));
        let (commands_tx, commands_rx) = unbounded();
        let (completions_tx, completions_rx) = unbounded();

        let pipeline = self.transport.map(|(transport, runtime)| {
            AssetFetchPipeline::new(
                transport,
                runtime,
                intake.session.clone(),
                completions_tx,
                self.config.fetch_concurrency,
                self.config.image_cache_capacity,
            )
        });

        let geometry = LaneGeometry::compute(self.viewport, &settings, &self.config);
        let lanes = LaneScheduler::new(
            self.config.lane_policy,
            geometry.lane_count,
            self.config.lane_gap_ms,
        );
        let sprites = SpriteRegistry::new(&self.config, measure);

        OverlayController {
            config: self.config,
            settings,
            active: false,
            shown_session: None,
            viewport: self.viewport,
            geometry,
            intake,
            lanes,
            sprites,
            pipeline,
            activation: CancellationToken::new(),
            commands_tx,
            commands_rx,
            completions_rx,
            last_tick_ms: None,
            frame_number: 0,
            blank_pending: false,
        }
    }
}

/// Schedules chat events onto lanes and drives sprites across the viewport.
pub struct OverlayController {
    config: OverlayConfig,
    settings: Settings,
    active: bool,
    /// Session whose sprites are on screen.
    shown_session: Option<String>,
    viewport: Viewport,
    geometry: LaneGeometry,
    intake: Arc<Intake>,
    lanes: LaneScheduler,
    sprites: SpriteRegistry,
    pipeline: Option<AssetFetchPipeline>,
    /// Cancelled on every clear; fetches started under it post nothing.
    activation: CancellationToken,
    commands_tx: Sender<OverlayCommand>,
    commands_rx: Receiver<OverlayCommand>,
    completions_rx: Receiver<AssetCompletion>,
    last_tick_ms: Option<u64>,
    frame_number: u64,
    /// A blank frame must be presented so the surface drops stale sprites.
    blank_pending: bool,
}

impl std::fmt::Debug for OverlayController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayController")
            .field("state", &self.state())
            .field("settings", &self.settings)
            .field("viewport", &self.viewport)
            .field("geometry", &self.geometry)
            .field("sprites", &self.sprites)
            .field("pending", &self.intake.queue.len())
            .field("frame_number", &self.frame_number)
            .finish_non_exhaustive()
    }
}

impl OverlayController {
    /// Start building a controller.
    pub fn builder(config: OverlayConfig) -> OverlayBuilder {
        OverlayBuilder {
            config,
            settings: Settings::default(),
            viewport: Viewport::ZERO,
            clock: None,
            measure: None,
            transport: None,
        }
    }

    /// A controller with default collaborators and no emote loading.
    pub fn new(config: OverlayConfig) -> Self {
        Self::builder(config).build()
    }

    /// Cloneable handle for other threads.
    pub fn handle(&self) -> OverlayHandle {
        OverlayHandle::new(Arc::clone(&self.intake), self.commands_tx.clone())
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> OverlayState {
        OverlayState::from_flags(self.active, self.settings.enabled)
    }

    /// Current (sanitized) settings.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Static configuration.
    pub const fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Current drawing area.
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Current lane grid.
    pub const fn geometry(&self) -> &LaneGeometry {
        &self.geometry
    }

    /// Live sprites.
    pub const fn sprites(&self) -> &SpriteRegistry {
        &self.sprites
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.intake.queue.len()
    }

    /// Active chat session, if any.
    pub fn session(&self) -> Option<String> {
        self.intake.session.current()
    }

    /// Emote pipeline, if a transport was configured.
    pub const fn pipeline(&self) -> Option<&AssetFetchPipeline> {
        self.pipeline.as_ref()
    }

    /// Offer a chat event.
    ///
    /// Dropped while the overlay is not running, when it belongs to another
    /// session, when it is blank, or when it repeats within the dedup window.
    pub fn enqueue(&self, event: ChatEvent) -> IngestOutcome {
        self.intake.offer(event)
    }

    /// Drop everything queued and on screen.
    pub fn clear(&mut self) {
        self.clear_all();
    }

    /// Reset to an empty overlay: queue, dedup map, sprites and lanes are
    /// emptied, in-flight fetches are abandoned and a blank frame is
    /// scheduled.
    pub fn clear_all(&mut self) {
        self.intake.reset();
        self.clear_display();
    }

    /// Clear the tick-owned half: sprites, lanes and fetches.
    fn clear_display(&mut self) {
        self.activation.cancel();
        self.activation = CancellationToken::new();
        if let Some(pipeline) = &self.pipeline {
            pipeline.reset();
        }
        // Completions already posted refer to sprites about to disappear.
        while self.completions_rx.try_recv().is_ok() {}

        let dropped = self.sprites.len();
        self.sprites.clear();
        self.lanes.reset();
        self.blank_pending = true;

        tracing::debug!(dropped, "overlay cleared");
    }

    /// Show or hide the overlay. Hiding clears everything.
    pub fn set_active(&mut self, active: bool) {
        self.intake.activate(active);
        self.follow_active(active);
    }

    fn follow_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        // Ticks before this one may be arbitrarily old.
        self.last_tick_ms = None;
        tracing::debug!(active, "overlay activation changed");
        if !active {
            self.clear_display();
        }
    }

    /// Adopt new settings.
    ///
    /// Disabling the overlay or changing its geometry clears it.
    pub fn apply_settings(&mut self, settings: Settings) -> SettingsChange {
        self.intake.adopt_settings(settings);
        self.follow_settings(settings)
    }

    fn follow_settings(&mut self, settings: Settings) -> SettingsChange {
        let next = settings.sanitized();
        let change = SettingsChange::between(&self.settings, &next);
        let rescaled = (next.font_scale - self.settings.font_scale).abs() > f64::EPSILON;
        // Adopted even below the geometry threshold.
        self.settings = next;

        if !change.is_empty() && (!next.enabled || change.contains(SettingsChange::GEOMETRY)) {
            self.clear_display();
        }
        if rescaled || change.contains(SettingsChange::GEOMETRY) {
            self.relayout();
        }
        if change.contains(SettingsChange::ENABLED) {
            self.last_tick_ms = None;
        }

        if !change.is_empty() {
            tracing::debug!(?change, ?next, "settings applied");
        }
        change
    }

    /// Switch the active chat session. A change clears everything.
    pub fn set_session(&mut self, session_id: Option<String>) {
        self.intake.switch_session(session_id.clone());
        self.follow_session(session_id);
    }

    fn follow_session(&mut self, session_id: Option<String>) {
        let next = SessionGate::normalize(session_id);
        if self.shown_session == next {
            return;
        }
        tracing::debug!(session = ?next, "session changed");
        self.shown_session = next;
        self.clear_display();
    }

    /// The drawing area changed size.
    pub fn resize(&mut self, width: f64, height: f64) {
        let viewport = Viewport::new(width, height);
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.relayout();
        tracing::debug!(?viewport, lanes = self.geometry.lane_count, "viewport resized");
    }

    fn relayout(&mut self) {
        self.geometry = LaneGeometry::compute(self.viewport, &self.settings, &self.config);
        if self.geometry.lane_count != self.lanes.lane_count() {
            self.lanes.resize(self.geometry.lane_count);
        }
    }

    /// Apply one command posted by an [`OverlayHandle`].
    ///
    /// The handle already updated the shared intake when it posted the
    /// command, so only tick-owned state changes here; the ingest queue is
    /// left alone.
    pub fn apply(&mut self, command: OverlayCommand) {
        match command {
            OverlayCommand::Clear => self.clear_display(),
            OverlayCommand::SetActive(active) => self.follow_active(active),
            OverlayCommand::ApplySettings(settings) => {
                self.follow_settings(settings);
            }
            OverlayCommand::SetSession(session) => self.follow_session(session),
            OverlayCommand::Resize { width, height } => self.resize(width, height),
        }
    }

    fn drain_inbox(&mut self) {
        while let Ok(command) = self.commands_rx.try_recv() {
            self.apply(command);
        }
        while let Ok(done) = self.completions_rx.try_recv() {
            for id in done.sprites {
                self.sprites.attach_image(id, done.image.clone());
            }
        }
    }

    /// Run one frame: apply pending commands and fetch results, move and
    /// retire sprites, spawn new ones and present the result.
    pub fn tick<S>(&mut self, surface: &mut S) -> TickStats
    where
        S: RenderSurface + ?Sized,
    {
        self.drain_inbox();
        self.frame_number += 1;

        let now = self.intake.clock.now_ms();
        let mut stats = TickStats {
            frame_number: self.frame_number,
            ..TickStats::default()
        };

        if !self.state().is_running() || !self.viewport.is_valid() {
            self.last_tick_ms = Some(now);
            if self.blank_pending {
                surface.present(&Frame::blank(
                    self.frame_number,
                    self.viewport,
                    self.settings.opacity,
                ));
                self.blank_pending = false;
            }
            stats.idle = true;
            stats.pending = self.intake.queue.len();
            return stats;
        }

        #[allow(clippy::cast_precision_loss)]
        let dt = self.last_tick_ms.map_or_else(
            || sanitize_dt(f64::NAN),
            |last| sanitize_dt(now.saturating_sub(last) as f64 / 1000.0),
        );
        self.last_tick_ms = Some(now);

        stats.dt = dt;
        stats.retired = self.sprites.advance(dt);
        stats.spawned = self.spawn(now);
        stats.live = self.sprites.len();
        stats.pending = self.intake.queue.len();

        surface.present(&Frame {
            frame_number: self.frame_number,
            viewport: self.viewport,
            opacity: self.settings.opacity,
            visible: true,
            sprites: self.sprites.as_slice(),
        });
        self.blank_pending = false;
        stats
    }

    fn spawn(&mut self, now_ms: u64) -> usize {
        let budget = self.settings.max_spawn_per_tick();
        if budget == 0 || self.intake.queue.is_empty() {
            return 0;
        }

        let tails = self.sprites.lane_tails(self.geometry.lane_count);
        self.lanes.begin_tick(&tails);
        if !self.lanes.has_capacity(&self.geometry) {
            return 0;
        }

        let mut spawned = 0;
        while spawned < budget {
            // Stale events must not cost a lane reservation.
            let session = &self.intake.session;
            self.intake
                .queue
                .drop_front_while(|event| !session.admits(&event.session_id));
            if self.intake.queue.is_empty() {
                break;
            }
            let Some(lane) = self.lanes.reserve(now_ms, &self.geometry) else {
                break;
            };
            let Some(event) = self.intake.queue.pop_front() else {
                break;
            };

            let sprite = self
                .sprites
                .spawn(&event, lane, &self.geometry, self.viewport);
            let (id, width) = (sprite.id, sprite.width);
            self.lanes.commit(lane, width, &self.geometry);
            spawned += 1;

            if let Some(url) = &event.image_url {
                self.request_image(&event.session_id, url, id);
            }
        }
        spawned
    }

    fn request_image(&mut self, session_id: &str, url: &str, sprite: SpriteId) {
        let outcome = self.pipeline.as_ref().map_or(RequestOutcome::Skipped, |p| {
            p.request(session_id, url, sprite, &self.activation)
        });
        match outcome {
            RequestOutcome::Cached(image) => {
                self.sprites.attach_image(sprite, ImageSlot::Loaded(image));
            }
            RequestOutcome::Skipped => {
                self.sprites.attach_image(sprite, ImageSlot::Failed);
            }
            RequestOutcome::Joined | RequestOutcome::Started => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{png_base64, FetchedImage};
    use crate::clock::ManualClock;
    use crate::config::{AreaMode, LanePolicy};
    use crate::ingest::Rejected;
    use crate::render::RecordingSurface;
    use async_trait::async_trait;
    use std::time::Duration;

    fn config() -> OverlayConfig {
        OverlayConfig {
            rng_seed: Some(7),
            ..OverlayConfig::default()
        }
    }

    fn controller() -> (OverlayController, ManualClock) {
        let clock = ManualClock::new(1_000);
        let mut c = OverlayController::builder(config())
            .viewport(640.0, 360.0)
            .clock(Arc::new(clock.clone()))
            .build();
        c.set_active(true);
        (c, clock)
    }

    fn flood_from(c: &OverlayController, prefix: &str, n: usize) {
        for i in 0..n {
            assert!(c.enqueue(ChatEvent::new("s1", "u", format!("{prefix} {i}"))).is_accepted());
        }
    }

    fn flood(c: &OverlayController, n: usize) {
        for i in 0..n {
            assert!(c.enqueue(ChatEvent::new("s1", "u", format!("msg {i}"))).is_accepted());
        }
    }

    #[test]
    fn test_starts_inactive_and_drops_events() {
        let c = OverlayController::builder(config()).viewport(640.0, 360.0).build();
        assert_eq!(c.state(), OverlayState::Inactive);
        assert_eq!(
            c.enqueue(ChatEvent::new("s1", "a", "hi")),
            IngestOutcome::Rejected(Rejected::Inactive)
        );
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn test_dedup_through_controller() {
        let (c, clock) = controller();
        assert!(c.enqueue(ChatEvent::new("s1", "a", "hi")).is_accepted());
        clock.advance(50);
        assert!(!c.enqueue(ChatEvent::new("s1", "a", "hi")).is_accepted());
        clock.advance(10);
        assert!(c.enqueue(ChatEvent::new("s1", "b", "yo")).is_accepted());
        assert_eq!(c.pending(), 2);
    }

    #[test]
    fn test_density_budget() {
        let (mut c, _) = controller();
        let mut surface = RecordingSurface::new();
        c.apply_settings(Settings {
            density: 0.0,
            ..Settings::default()
        });
        flood(&c, 20);
        let stats = c.tick(&mut surface);
        assert_eq!(stats.spawned, 0);
        assert_eq!(c.pending(), 20);

        c.apply_settings(Settings::default());
        let stats = c.tick(&mut surface);
        assert_eq!(stats.spawned, 6);
        assert_eq!(c.pending(), 14);
        assert_eq!(surface.last.len(), 6);
    }

    #[test]
    fn test_half_density_budget() {
        let (mut c, _) = controller();
        c.apply_settings(Settings {
            density: 0.5,
            ..Settings::default()
        });
        flood(&c, 20);
        assert_eq!(c.tick(&mut RecordingSurface::new()).spawned, 3);
    }

    #[test]
    fn test_tail_policy_saturates_lanes() {
        let (mut c, _) = controller();
        let mut surface = RecordingSurface::new();
        flood(&c, 30);
        assert_eq!(c.geometry().lane_count, 10);
        assert_eq!(c.tick(&mut surface).spawned, 6);
        assert_eq!(c.tick(&mut surface).spawned, 4);
        // Every lane is busy at the spawn edge; nothing moves without time.
        assert_eq!(c.tick(&mut surface).spawned, 0);
        assert_eq!(c.pending(), 20);
    }

    #[test]
    fn test_no_overlap_at_spawn() {
        let (mut c, clock) = controller();
        let mut surface = RecordingSurface::new();
        for i in 0..400 {
            c.enqueue(ChatEvent::new("s1", format!("u{i}"), "x".repeat(i % 17 + 1)));
        }
        let gap = c.geometry().gap_px;
        let spawn_x = c.viewport().spawn_x();
        for _ in 0..600 {
            clock.advance(16);
            let before: Vec<SpriteId> = c.sprites().iter().map(|s| s.id).collect();
            c.tick(&mut surface);
            for fresh in c.sprites().iter().filter(|s| !before.contains(&s.id)) {
                assert!((fresh.x - spawn_x).abs() < f64::EPSILON);
                for other in c.sprites().iter() {
                    if other.id != fresh.id && other.lane == fresh.lane {
                        assert!(other.right() <= fresh.x - gap + 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_sprites_move_and_retire() {
        let (mut c, clock) = controller();
        let mut surface = RecordingSurface::new();
        c.enqueue(ChatEvent::new("s1", "a", "hello"));
        c.tick(&mut surface);
        let x0 = surface.last[0].x;
        clock.advance(16);
        c.tick(&mut surface);
        assert!(surface.last[0].x < x0);

        // Travel time is at most 10s; 0.2s steps are the largest accepted.
        for _ in 0..60 {
            clock.advance(200);
            c.tick(&mut surface);
        }
        assert!(c.sprites().is_empty());
        assert!(surface.last.is_empty());
    }

    #[test]
    fn test_deactivate_clears_everything() {
        let (mut c, _) = controller();
        let mut surface = RecordingSurface::new();
        flood(&c, 20);
        c.tick(&mut surface);
        assert!(!c.sprites().is_empty());

        c.set_active(false);
        let stats = c.tick(&mut surface);
        assert!(stats.idle);
        assert!(!surface.last_visible);
        assert!(surface.last.is_empty());

        c.set_active(true);
        assert_eq!(c.pending(), 0);
        assert!(c.sprites().is_empty());
        assert_eq!(c.intake.queue.dedup_len(), 0);
    }

    #[test]
    fn test_blank_frame_presented_once() {
        let (mut c, _) = controller();
        let mut surface = RecordingSurface::new();
        flood(&c, 3);
        c.tick(&mut surface);
        c.set_active(false);
        c.tick(&mut surface);
        c.tick(&mut surface);
        assert_eq!(surface.frames, 2);
    }

    #[test]
    fn test_geometry_change_clears_sprites() {
        let (mut c, _) = controller();
        let mut surface = RecordingSurface::new();
        flood(&c, 20);
        c.tick(&mut surface);

        let change = c.apply_settings(Settings {
            area: AreaMode::Half,
            ..Settings::default()
        });
        assert!(change.contains(SettingsChange::GEOMETRY));
        assert!(c.sprites().is_empty());
        assert_eq!(c.pending(), 0);
        assert_eq!(c.geometry().lane_count, 5);
    }

    #[test]
    fn test_opacity_change_keeps_sprites() {
        let (mut c, _) = controller();
        let mut surface = RecordingSurface::new();
        flood(&c, 3);
        c.tick(&mut surface);
        let change = c.apply_settings(Settings {
            opacity: 0.4,
            ..Settings::default()
        });
        assert_eq!(change, SettingsChange::OPACITY);
        assert_eq!(c.sprites().len(), 3);
        c.tick(&mut surface);
        assert!((surface.last_opacity - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disable_clears_and_idles() {
        let (mut c, _) = controller();
        flood(&c, 3);
        c.tick(&mut RecordingSurface::new());
        c.apply_settings(Settings {
            enabled: false,
            ..Settings::default()
        });
        assert_eq!(c.state(), OverlayState::Disabled);
        assert!(c.sprites().is_empty());
        assert!(!c.enqueue(ChatEvent::new("s1", "a", "late")).is_accepted());
        assert!(c.tick(&mut RecordingSurface::new()).idle);
    }

    #[test]
    fn test_invalid_viewport_idles() {
        let clock = ManualClock::new(0);
        let mut c = OverlayController::builder(config())
            .clock(Arc::new(clock))
            .build();
        c.set_active(true);
        flood(&c, 5);
        let mut surface = RecordingSurface::new();
        let stats = c.tick(&mut surface);
        assert!(stats.idle);
        assert_eq!(surface.frames, 0);
        assert_eq!(c.pending(), 5);

        c.resize(640.0, 360.0);
        assert_eq!(c.tick(&mut surface).spawned, 5);
    }

    #[test]
    fn test_session_change_clears() {
        let (mut c, _) = controller();
        c.set_session(Some("s1".into()));
        flood(&c, 10);
        c.tick(&mut RecordingSurface::new());
        assert!(!c.enqueue(ChatEvent::new("s2", "a", "other room")).is_accepted());

        c.set_session(Some("s2".into()));
        assert!(c.sprites().is_empty());
        assert_eq!(c.pending(), 0);
        assert!(c.enqueue(ChatEvent::new("s2", "a", "new room")).is_accepted());

        // Setting the same session again is a no-op.
        c.set_session(Some("s2".into()));
        assert_eq!(c.pending(), 1);
    }

    #[test]
    fn test_commands_applied_on_tick() {
        let (mut c, _) = controller();
        let handle = c.handle();
        handle.apply_settings(Settings {
            density: 0.0,
            ..Settings::default()
        });
        assert!(handle.enqueue(ChatEvent::new("s1", "a", "hi")).is_accepted());
        let stats = c.tick(&mut RecordingSurface::new());
        assert_eq!(stats.spawned, 0);
        assert!((c.settings().density).abs() < f64::EPSILON);

        handle.resize(320.0, 200.0);
        handle.set_active(false);
        c.tick(&mut RecordingSurface::new());
        assert_eq!(c.viewport(), Viewport::new(320.0, 200.0));
        assert_eq!(c.state(), OverlayState::Inactive);
    }

    #[test]
    fn test_image_without_transport_is_text_only() {
        let (mut c, _) = controller();
        c.enqueue(ChatEvent::new("s1", "a", "look").with_image("http://e/1.png", None));
        c.tick(&mut RecordingSurface::new());
        let sprite = c.sprites().iter().next().unwrap();
        assert!(matches!(sprite.image, ImageSlot::Failed));
        // Space for the emote stays reserved.
        assert!(sprite.width > c.sprites().measure("look", false, c.geometry()));
    }

    #[test]
    fn test_pacing_policy_spawns_full_budget() {
        let clock = ManualClock::new(0);
        let mut c = OverlayController::builder(OverlayConfig {
            lane_policy: LanePolicy::Pacing,
            ..config()
        })
        .viewport(640.0, 360.0)
        .clock(Arc::new(clock.clone()))
        .build();
        c.set_active(true);
        flood(&c, 30);
        let mut surface = RecordingSurface::new();
        for _ in 0..3 {
            clock.advance(16);
            assert_eq!(c.tick(&mut surface).spawned, 6);
        }
        let mut lanes: Vec<_> = c.sprites().iter().map(|s| s.lane).collect();
        lanes.sort_unstable();
        lanes.dedup();
        assert_eq!(lanes.len(), 10);
    }

    #[test]
    fn test_stale_events_do_not_stamp_pacing_lanes() {
        let clock = ManualClock::new(0);
        let mut c = OverlayController::builder(OverlayConfig {
            lane_policy: LanePolicy::Pacing,
            ..config()
        })
        .viewport(640.0, 360.0)
        .clock(Arc::new(clock))
        .build();
        c.set_active(true);
        for i in 0..3 {
            c.enqueue(ChatEvent::new("s0", "u", format!("old {i}")));
        }
        c.enqueue(ChatEvent::new("s1", "u", "fresh"));
        // The gate moves without the queue being emptied, as when a switch
        // races an in-progress tick.
        c.intake.session.set(Some("s1".into()));

        let mut surface = RecordingSurface::new();
        assert_eq!(c.tick(&mut surface).spawned, 1);
        assert_eq!(surface.last[0].text, "fresh");
        assert_eq!(surface.last[0].lane, 0);
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn test_small_font_steps_are_adopted() {
        let (mut c, _) = controller();
        flood(&c, 3);
        c.tick(&mut RecordingSurface::new());
        let mut scale = 1.0;
        for _ in 0..5 {
            scale += 0.0005;
            let change = c.apply_settings(Settings {
                font_scale: scale,
                ..Settings::default()
            });
            assert!(change.is_empty());
        }
        assert!((c.settings().font_scale - scale).abs() < f64::EPSILON);
        assert_eq!(c.sprites().len(), 3);
    }

    #[test]
    fn test_marshaled_clear_keeps_queue() {
        let (mut c, _) = controller();
        flood(&c, 3);
        c.tick(&mut RecordingSurface::new());
        flood_from(&c, "late", 2);
        c.apply(OverlayCommand::Clear);
        assert!(c.sprites().is_empty());
        assert_eq!(c.pending(), 2);
    }

    struct PngTransport;

    #[async_trait]
    impl ImageTransport for PngTransport {
        async fn fetch_image(
            &self,
            _session_id: &str,
            _url: &str,
            _cancel: CancellationToken,
        ) -> anyhow::Result<FetchedImage> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(FetchedImage::new("image/png", png_base64(4, 4)))
        }
    }

    fn wait_for(c: &mut OverlayController, mut done: impl FnMut(&OverlayController) -> bool) -> bool {
        for _ in 0..200 {
            c.tick(&mut RecordingSurface::new());
            if done(&*c) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_image_attaches_after_fetch() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let mut c = OverlayController::builder(config())
            .viewport(640.0, 360.0)
            .clock(Arc::new(ManualClock::new(0)))
            .transport(Arc::new(PngTransport), rt.handle().clone())
            .build();
        c.set_active(true);
        c.set_session(Some("s1".into()));
        c.enqueue(ChatEvent::new("s1", "a", "").with_image("http://e/kappa.png", None));
        c.enqueue(ChatEvent::new("s1", "b", "same").with_image("http://e/kappa.png", None));

        assert!(wait_for(&mut c, |c| {
            c.sprites()
                .iter()
                .all(|s| matches!(s.image, ImageSlot::Loaded(_)))
                && c.sprites().len() == 2
        }));
        let loaded = c.sprites().iter().next().unwrap().image.loaded().unwrap().clone();
        assert_eq!((loaded.width, loaded.height), (4, 4));

        // A later sprite with the same URL is served from the cache.
        c.enqueue(ChatEvent::new("s1", "c", "again").with_image("http://e/kappa.png", None));
        c.tick(&mut RecordingSurface::new());
        assert!(c
            .sprites()
            .iter()
            .all(|s| matches!(s.image, ImageSlot::Loaded(_))));
    }

    #[test]
    fn test_clear_abandons_fetches() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let mut c = OverlayController::builder(config())
            .viewport(640.0, 360.0)
            .clock(Arc::new(ManualClock::new(0)))
            .transport(Arc::new(PngTransport), rt.handle().clone())
            .build();
        c.set_active(true);
        c.set_session(Some("s1".into()));
        c.enqueue(ChatEvent::new("s1", "a", "x").with_image("http://e/1.png", None));
        c.tick(&mut RecordingSurface::new());
        assert_eq!(c.pipeline().unwrap().in_flight(), 1);
        c.clear();
        assert_eq!(c.pipeline().unwrap().in_flight(), 0);
        std::thread::sleep(Duration::from_millis(50));
        c.tick(&mut RecordingSurface::new());
        assert!(c.sprites().is_empty());
    }
}
