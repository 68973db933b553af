//! Ingest: Thread-safe intake of chat events.
//!
//! Events arrive on the protocol client's receive thread at arbitrary
//! rates. The queue deduplicates bursts of identical messages and sheds the
//! oldest backlog when the tick loop falls behind, so memory stays bounded
//! no matter how hard the stream floods.

mod queue;

pub use queue::{IngestOutcome, IngestQueue, Rejected};
