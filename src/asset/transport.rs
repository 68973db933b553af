//! Image transport: the backend that actually downloads emotes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Raw emote payload as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchedImage {
    /// MIME type reported by the backend (informational).
    pub mime: String,
    /// Base64 image bytes. Empty means "no image available".
    pub base64: String,
}

impl FetchedImage {
    /// Create a payload.
    pub fn new(mime: impl Into<String>, base64: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            base64: base64.into(),
        }
    }

    /// Whether the backend had nothing for this URL.
    pub fn is_empty(&self) -> bool {
        self.base64.trim().is_empty()
    }
}

/// Fetches emote bytes on behalf of a stream session.
///
/// Implementations should observe `cancel` and return early; the pipeline
/// also races every call against it.
#[async_trait]
pub trait ImageTransport: Send + Sync {
    /// Fetch `url` using the credentials of `session_id`.
    async fn fetch_image(
        &self,
        session_id: &str,
        url: &str,
        cancel: CancellationToken,
    ) -> anyhow::Result<FetchedImage>;
}
