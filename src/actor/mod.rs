//! Actor Model: Threads and messages around the controller.
//!
//! - **Ticker Actor**: Emits pacing ticks, dropping them when the consumer lags
//! - **Tick Thread**: Owns the controller and the render surface
//! - **Handle**: Lets any thread enqueue events and send commands
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐      ChatEvent      ┌──────────────┐
//! │ Host Threads │ ──────────────────▶ │ Ingest Queue │
//! └──────────────┘                     └──────────────┘
//!        │                                    │ pop
//!        │ OverlayCommand                     ▼
//!        │                             ┌──────────────┐    Frame    ┌─────────┐
//!        └───────────────────────────▶ │ Tick Thread  │ ──────────▶ │ Surface │
//!                                      └──────────────┘             └─────────┘
//! ┌──────────────┐        Tick                ▲
//! │Ticker Thread │ ───────────────────────────┘
//! └──────────────┘
//! ```

mod handle;
mod messages;
mod runtime;
mod ticker;

pub use handle::OverlayHandle;
pub use messages::{FrameInfo, OverlayCommand, TickStats};
pub use runtime::OverlayRuntime;
pub use ticker::{Tick, TickerActor};
