//! Collaborator contracts
//!
//! The player drives three collaborators and never depends on their concrete
//! types: a stream resolver, an audio engine and a related-tracks provider.

use crate::error::{EngineError, FetchError, ResolveError};
use crate::types::{AudioQuality, EngineEvent, LoopMode, PlaybackData, Track, TrackId};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

/// Resolves track ids into playable stream descriptors
///
/// Implementations own their cache. The player may invalidate entries but
/// never writes content into the cache.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Resolve a track into playback data
    ///
    /// Implementations apply their own timeouts and retries; an error means
    /// every strategy has been exhausted.
    async fn resolve(&self, id: &TrackId, quality: AudioQuality) -> Result<PlaybackData, ResolveError>;

    /// Warm the cache for a batch of tracks, best effort
    async fn prefetch(&self, ids: &[TrackId], quality: AudioQuality);

    /// Warm the cache for the track that plays next, best effort
    async fn prefetch_next(&self, id: &TrackId, quality: AudioQuality);

    /// Whether usable data for `id` is cached
    fn has_cached(&self, id: &TrackId) -> bool;

    /// Drop the cached entry for `id`
    fn invalidate(&self, id: &TrackId);

    /// Drop every cached entry
    fn invalidate_all(&self);
}

/// Audio output engine
///
/// All push-streams are exposed through [`AudioEngine::subscribe`].
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Load a source; `preload` asks the engine to start buffering immediately
    async fn set_source(&self, uri: &str, preload: bool) -> Result<(), EngineError>;

    /// Start or resume playback
    async fn play(&self) -> Result<(), EngineError>;

    /// Pause playback
    async fn pause(&self) -> Result<(), EngineError>;

    /// Stop playback and release the source
    async fn stop(&self) -> Result<(), EngineError>;

    /// Seek within the current source
    async fn seek(&self, position: Duration) -> Result<(), EngineError>;

    /// Set the playback speed multiplier
    async fn set_speed(&self, speed: f32) -> Result<(), EngineError>;

    /// Set the engine's own loop mode
    async fn set_loop_mode(&self, mode: LoopMode) -> Result<(), EngineError>;

    /// Subscribe to engine events
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}

/// Source of related tracks for radio mode
#[async_trait]
pub trait RelatedTracksProvider: Send + Sync {
    /// Fetch up to `limit` tracks related to `seed`
    async fn fetch_related(&self, seed: &TrackId, limit: usize) -> Result<Vec<Track>, FetchError>;
}
