//! Assets: Inline emote images attached to live sprites.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  request   ┌──────────────────┐  fetch_image  ┌───────────┐
//! │  Tick Thread │ ─────────▶ │  Fetch Pipeline  │ ────────────▶ │ Transport │
//! └──────────────┘            │ (tokio, sem = 4) │               └───────────┘
//!        ▲                    └──────────────────┘
//!        │      AssetCompletion        │
//!        └─────────────────────────────┘
//! ```
//!
//! Every fetch re-validates the session and the activation token before and
//! after waiting for a permit, so a room switch stops wasted work early and
//! never paints an emote from the previous room.

mod cache;
mod decode;
mod pipeline;
mod session;
mod transport;

pub use cache::ImageCache;
pub use decode::{decode_image, DecodedImage};
pub use pipeline::{AssetCompletion, AssetFetchPipeline, RequestOutcome};
pub use session::SessionGate;
pub use transport::{FetchedImage, ImageTransport};

#[cfg(test)]
pub(crate) use decode::png_base64;
