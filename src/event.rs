//! Chat events: The typed, validated record delivered by the protocol client.

use crate::error::EventError;
use serde::{Deserialize, Serialize};

/// Placeholder texts platforms send alongside an emote image.
const IMAGE_PLACEHOLDERS: [&str; 3] = ["[图片]", "[image]", "[img]"];

/// A single chat message to be shown on the overlay.
///
/// All string fields are trimmed on construction. A blank `image_url`
/// is stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChatEvent", rename_all = "camelCase")]
pub struct ChatEvent {
    /// Stream session that produced this event.
    pub session_id: String,
    /// Unix epoch milliseconds when the protocol client received it.
    pub received_at_ms: i64,
    /// Display name of the sender (may be empty).
    pub user: String,
    /// Message text (may be empty for image-only messages).
    pub text: String,
    /// Inline emote image URL.
    pub image_url: Option<String>,
    /// Intrinsic emote width in pixels, if the platform reported one.
    ///
    /// Informational only: sprites always reserve a fixed square scaled
    /// with the font, so lane layout never depends on platform metadata.
    pub image_width: Option<u32>,
}

/// Loosely-typed wire shape, validated into [`ChatEvent`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChatEvent {
    session_id: String,
    #[serde(default)]
    received_at_ms: i64,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    image_width: Option<u32>,
}

impl TryFrom<RawChatEvent> for ChatEvent {
    type Error = EventError;

    fn try_from(raw: RawChatEvent) -> Result<Self, Self::Error> {
        let session_id = raw.session_id.trim().to_string();
        if session_id.is_empty() {
            return Err(EventError::MissingSession);
        }
        Ok(Self::new(
            session_id,
            raw.user.unwrap_or_default(),
            raw.text.unwrap_or_default(),
        )
        .received_at(raw.received_at_ms)
        .with_image(raw.image_url.unwrap_or_default(), raw.image_width))
    }
}

impl ChatEvent {
    /// Create a text event.
    pub fn new(
        session_id: impl Into<String>,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into().trim().to_string(),
            received_at_ms: 0,
            user: user.into().trim().to_string(),
            text: text.into().trim().to_string(),
            image_url: None,
            image_width: None,
        }
    }

    /// Set the receive timestamp.
    #[must_use]
    pub const fn received_at(mut self, ms: i64) -> Self {
        self.received_at_ms = ms;
        self
    }

    /// Attach an emote image. Blank URLs and zero widths are ignored.
    #[must_use]
    pub fn with_image(mut self, url: impl Into<String>, width: Option<u32>) -> Self {
        let url = url.into();
        let url = url.trim();
        self.image_url = (!url.is_empty()).then(|| url.to_string());
        self.image_width = width.filter(|w| *w > 0);
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        // Validate outside serde so a blank session keeps its own variant.
        let raw: RawChatEvent = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// The emote URL, or `""`.
    pub fn image_url(&self) -> &str {
        self.image_url.as_deref().unwrap_or("")
    }

    /// Whether the event has neither text nor image.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.image_url().trim().is_empty()
    }

    /// Temporal dedup key: `user \n text \n image_url`.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.user.trim(),
            self.text.trim(),
            self.image_url().trim()
        )
    }

    /// Text to render on the sprite.
    ///
    /// Image messages whose text is empty or a known placeholder render
    /// image-only.
    pub fn display_text(&self) -> &str {
        let text = self.text.trim();
        if self.image_url.is_some() && is_image_placeholder(text) {
            ""
        } else {
            text
        }
    }
}

/// Whether `text` is an empty or placeholder caption for an image.
pub fn is_image_placeholder(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || IMAGE_PLACEHOLDERS.iter().any(|p| t.eq_ignore_ascii_case(p))
}
