//! Fetch pipeline: bounded, cancellable emote loading.
//!
//! Each request runs as a task on the host's tokio runtime. Results never
//! touch sprites directly: they are posted as [`AssetCompletion`] messages
//! into the tick thread's inbox and applied at the start of the next tick.

use super::cache::ImageCache;
use super::decode::{decode_image, DecodedImage};
use super::session::SessionGate;
use super::transport::ImageTransport;
use crate::error::FetchError;
use crate::sprite::{ImageSlot, SpriteId};
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Result of a finished fetch, addressed to the sprites waiting for it.
#[derive(Debug, Clone)]
pub struct AssetCompletion {
    /// Emote URL.
    pub url: String,
    /// Sprites to update.
    pub sprites: Vec<SpriteId>,
    /// `Loaded` or `Failed`.
    pub image: ImageSlot,
}

/// What [`AssetFetchPipeline::request`] did with a request.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// Already decoded; attach immediately.
    Cached(Arc<DecodedImage>),
    /// A fetch for the same URL is in flight and will resolve this sprite too.
    Joined,
    /// A new fetch task was started.
    Started,
    /// Nothing to do (blank input, stale session, cancelled activation).
    Skipped,
}

#[derive(Debug)]
struct PipelineState {
    cache: ImageCache,
    /// URL -> sprites waiting on the in-flight fetch.
    waiters: HashMap<String, Vec<SpriteId>>,
    /// Bumped by `reset`; tasks from older generations discard results.
    generation: u64,
}

/// Concurrency-limited emote fetcher.
pub struct AssetFetchPipeline {
    transport: Arc<dyn ImageTransport>,
    runtime: Handle,
    permits: Arc<Semaphore>,
    session: SessionGate,
    state: Arc<Mutex<PipelineState>>,
    completions: Sender<AssetCompletion>,
}

impl std::fmt::Debug for AssetFetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetFetchPipeline")
            .field("available_permits", &self.permits.available_permits())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn lock(state: &Mutex<PipelineState>) -> MutexGuard<'_, PipelineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AssetFetchPipeline {
    /// Create a pipeline.
    ///
    /// # Arguments
    ///
    /// * `transport` - Backend used to download emotes.
    /// * `runtime` - Runtime the fetch tasks are spawned on.
    /// * `session` - Gate shared with the controller.
    /// * `completions` - Inbox of the tick thread.
    /// * `concurrency` - Maximum simultaneous fetches.
    /// * `cache_capacity` - Decoded images kept by URL.
    pub fn new(
        transport: Arc<dyn ImageTransport>,
        runtime: Handle,
        session: SessionGate,
        completions: Sender<AssetCompletion>,
        concurrency: usize,
        cache_capacity: usize,
    ) -> Self {
        Self {
            transport,
            runtime,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            session,
            state: Arc::new(Mutex::new(PipelineState {
                cache: ImageCache::new(cache_capacity),
                waiters: HashMap::new(),
                generation: 0,
            })),
            completions,
        }
    }

    /// Request the emote at `url` for `sprite`.
    pub fn request(
        &self,
        session_id: &str,
        url: &str,
        sprite: SpriteId,
        token: &CancellationToken,
    ) -> RequestOutcome {
        let session_id = session_id.trim();
        let url = url.trim();
        if session_id.is_empty() || url.is_empty() || token.is_cancelled() {
            return RequestOutcome::Skipped;
        }
        if !self.session.is_current(session_id) {
            return RequestOutcome::Skipped;
        }

        let generation = {
            let mut state = lock(&self.state);
            if let Some(image) = state.cache.get(url) {
                return RequestOutcome::Cached(image);
            }
            if let Some(waiting) = state.waiters.get_mut(url) {
                waiting.push(sprite);
                return RequestOutcome::Joined;
            }
            state.waiters.insert(url.to_string(), vec![sprite]);
            state.generation
        };

        let job = FetchJob {
            transport: Arc::clone(&self.transport),
            permits: Arc::clone(&self.permits),
            session: self.session.clone(),
            session_id: session_id.to_string(),
            url: url.to_string(),
            token: token.clone(),
        };
        let state = Arc::clone(&self.state);
        let completions = self.completions.clone();

        self.runtime.spawn(async move {
            let url = job.url.clone();
            let result = job.run().await;
            finish(&state, &completions, generation, url, result);
        });
        RequestOutcome::Started
    }

    /// Forget in-flight bookkeeping for a new activation.
    ///
    /// Tasks still running finish quietly without posting completions.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.waiters.clear();
    }

    /// Drop every cached image.
    pub fn clear_cache(&self) {
        lock(&self.state).cache.clear();
    }

    /// Number of cached images.
    pub fn cached_len(&self) -> usize {
        lock(&self.state).cache.len()
    }

    /// Number of URLs currently being fetched.
    pub fn in_flight(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// The session gate this pipeline validates against.
    pub const fn session(&self) -> &SessionGate {
        &self.session
    }
}

/// One fetch, moved into its task.
struct FetchJob {
    transport: Arc<dyn ImageTransport>,
    permits: Arc<Semaphore>,
    session: SessionGate,
    session_id: String,
    url: String,
    token: CancellationToken,
}

impl FetchJob {
    fn ensure_live(&self) -> Result<(), FetchError> {
        if self.token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if !self.session.is_current(&self.session_id) {
            return Err(FetchError::StaleSession {
                session_id: self.session_id.clone(),
            });
        }
        Ok(())
    }

    async fn run(self) -> Result<Arc<DecodedImage>, FetchError> {
        self.ensure_live()?;

        let _permit = tokio::select! {
            biased;
            () = self.token.cancelled() => return Err(FetchError::Cancelled),
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.map_err(|_| FetchError::Cancelled)?
            }
        };
        self.ensure_live()?;

        let fetched = tokio::select! {
            biased;
            () = self.token.cancelled() => return Err(FetchError::Cancelled),
            fetched = self.transport.fetch_image(&self.session_id, &self.url, self.token.clone()) => fetched?,
        };
        if fetched.is_empty() {
            return Err(FetchError::Empty {
                url: self.url.clone(),
            });
        }

        // Decoding is CPU-bound; keep it off the async workers.
        let image = tokio::task::spawn_blocking(move || decode_image(&fetched))
            .await
            .map_err(|e| FetchError::Transport(e.into()))??;
        self.ensure_live()?;
        Ok(Arc::new(image))
    }
}

fn finish(
    state: &Mutex<PipelineState>,
    completions: &Sender<AssetCompletion>,
    generation: u64,
    url: String,
    result: Result<Arc<DecodedImage>, FetchError>,
) {
    let sprites = {
        let mut state = lock(state);
        if state.generation != generation {
            return;
        }
        let sprites = state.waiters.remove(&url).unwrap_or_default();
        if let Ok(image) = &result {
            state.cache.insert(url.clone(), Arc::clone(image));
        }
        sprites
    };

    let image = match result {
        Ok(image) => ImageSlot::Loaded(image),
        Err(e) if e.is_abort() => {
            tracing::debug!(url = %url, reason = %e, "emote fetch aborted");
            return;
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "emote fetch failed");
            ImageSlot::Failed
        }
    };

    if sprites.is_empty() {
        return;
    }
    // The receiver is gone only when the controller was dropped.
    let _ = completions.send(AssetCompletion { url, sprites, image });
}
