//! # Danmaku
//!
//! A scrolling chat overlay engine for livestream players.
//!
//! Live chat messages arrive from a protocol client at arbitrary rates. The
//! engine queues them with dedup and backpressure, assigns each one a
//! horizontal lane so moving messages never overlap at spawn time, animates
//! them right-to-left at a steady tick and attaches inline emote images
//! fetched in the background.
//!
//! ## Core Concepts
//!
//! - **Ingest queue**: FIFO with an 80 ms dedup window and load shedding
//! - **Lane scheduling**: Tail-geometry or pacing policies keep spawns apart
//! - **Tick loop**: One thread owns every sprite; others talk through a handle
//! - **Session gate**: Switching rooms drops queued work and stale emotes
//!
//! ## Example
//!
//! ```rust,no_run
//! use danmaku::{ChatEvent, OverlayConfig, OverlayController, OverlayRuntime, Frame};
//!
//! let controller = OverlayController::builder(OverlayConfig::default())
//!     .viewport(1280.0, 720.0)
//!     .build();
//! let runtime = OverlayRuntime::spawn(controller, |frame: &Frame<'_>| {
//!     for sprite in frame.visible_sprites() {
//!         let _ = (sprite.x, sprite.y, sprite.text);
//!     }
//! })?;
//!
//! let overlay = runtime.handle();
//! overlay.set_active(true);
//! overlay.enqueue(ChatEvent::new("room-1", "alice", "hello"));
//! # Ok::<(), std::io::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod asset;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod ffi;
pub mod ingest;
pub mod lane;
pub mod layout;
pub mod render;
pub mod sprite;

// Re-exports for convenience
pub use actor::{OverlayCommand, OverlayHandle, OverlayRuntime, TickStats};
pub use asset::{AssetFetchPipeline, DecodedImage, FetchedImage, ImageTransport};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{AreaMode, LanePolicy, OverlayConfig, Settings};
pub use controller::{OverlayBuilder, OverlayController, OverlayState, SettingsChange};
pub use error::{EventError, FetchError};
pub use event::ChatEvent;
pub use ingest::{IngestOutcome, IngestQueue};
pub use layout::{LaneGeometry, Viewport};
pub use render::{Frame, RecordingSurface, RenderSurface, SpriteView};
pub use sprite::{ImageSlot, Sprite, SpriteId, TextMeasure};
