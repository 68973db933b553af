//! Error taxonomy.
//!
//! Nothing here ever reaches the host UI: malformed events are rejected at
//! the ingestion boundary and fetch failures degrade to text-only sprites.
//! The types exist so that those paths can be logged with a cause.

/// A chat event that failed validation at the ingestion boundary.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The payload is not a well-formed chat event document.
    #[error("malformed chat event: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The event carries no session id, so liveness cannot be checked.
    #[error("chat event has a blank session id")]
    MissingSession,
}

/// Why an emote could not be attached to a sprite.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The transport failed (network, protocol, backend).
    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    /// The transport answered with an empty payload ("no image available").
    #[error("no image available for {url}")]
    Empty {
        /// Requested URL.
        url: String,
    },

    /// The payload was not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The bytes could not be decoded as an image.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// The activation was cleared while the fetch was in flight.
    #[error("fetch cancelled")]
    Cancelled,

    /// The session that requested the image is no longer active.
    #[error("session {session_id} is no longer active")]
    StaleSession {
        /// Session that issued the request.
        session_id: String,
    },
}

impl FetchError {
    /// Whether this failure is an expected abort rather than a real failure.
    ///
    /// Aborts post nothing back to the tick thread: the sprite they were
    /// meant for has already been cleared.
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Cancelled | Self::StaleSession { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_classification() {
        assert!(FetchError::Cancelled.is_abort());
        assert!(FetchError::StaleSession {
            session_id: "s1".to_string()
        }
        .is_abort());
        assert!(!FetchError::Empty {
            url: "u".to_string()
        }
        .is_abort());
        assert!(!FetchError::Transport(anyhow::anyhow!("boom")).is_abort());
    }

    #[test]
    fn test_messages() {
        let err = FetchError::StaleSession {
            session_id: "room-1".to_string(),
        };
        assert_eq!(err.to_string(), "session room-1 is no longer active");
        assert_eq!(
            EventError::MissingSession.to_string(),
            "chat event has a blank session id"
        );
    }
}
