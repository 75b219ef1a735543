//! In-memory caching stream resolver

use super::{stream_url, Catalog};
use async_trait::async_trait;
use drift_core::{AudioQuality, PlaybackData, ResolveError, StreamFormat, StreamResolver, TrackId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Resolver that mints `sim://` stream URLs for catalog tracks
///
/// Results are cached per track until their validity window runs out.
/// Resolutions fail at random with the configured failure rate.
pub struct SimulatedResolver {
    catalog: Arc<Catalog>,
    cache: Mutex<HashMap<TrackId, PlaybackData>>,
    rng: Mutex<StdRng>,
    latency: Duration,
    validity_secs: u64,
    failure_rate: f64,
}

impl SimulatedResolver {
    pub fn new(catalog: Arc<Catalog>, seed: u64) -> Self {
        Self {
            catalog,
            cache: Mutex::new(HashMap::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: Duration::ZERO,
            validity_secs: 600,
            failure_rate: 0.0,
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn with_validity(mut self, validity_secs: u64) -> Self {
        self.validity_secs = validity_secs;
        self
    }

    #[must_use]
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    pub fn cached_len(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<TrackId, PlaybackData>> {
        // A poisoned map still holds plain data
        self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn cached_valid(&self, id: &TrackId) -> Option<PlaybackData> {
        self.cache().get(id).filter(|data| data.is_valid()).cloned()
    }

    fn roll_failure(&self) -> bool {
        if self.failure_rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        rng.gen_bool(self.failure_rate)
    }

    async fn warm(&self, id: &TrackId, quality: AudioQuality) {
        if self.has_cached(id) {
            return;
        }
        if let Err(err) = self.resolve(id, quality).await {
            debug!(track_id = %id, error = %err, "prefetch failed");
        }
    }
}

#[async_trait]
impl StreamResolver for SimulatedResolver {
    async fn resolve(&self, id: &TrackId, quality: AudioQuality) -> Result<PlaybackData, ResolveError> {
        if let Some(data) = self.cached_valid(id) {
            return Ok(data);
        }
        if self.catalog.get(id).is_none() {
            return Err(ResolveError::Unavailable(id.clone()));
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.roll_failure() {
            return Err(ResolveError::network("simulated outage"));
        }

        let bitrate = quality.nominal_bitrate();
        let data = PlaybackData::new(
            stream_url(id, bitrate),
            StreamFormat::new("audio/ogg", bitrate).with_codec("opus"),
            self.validity_secs,
        );
        debug!(track_id = %id, %quality, "resolved stream");
        self.cache().insert(id.clone(), data.clone());
        Ok(data)
    }

    async fn prefetch(&self, ids: &[TrackId], quality: AudioQuality) {
        for id in ids {
            self.warm(id, quality).await;
        }
    }

    async fn prefetch_next(&self, id: &TrackId, quality: AudioQuality) {
        self.warm(id, quality).await;
    }

    fn has_cached(&self, id: &TrackId) -> bool {
        self.cached_valid(id).is_some()
    }

    fn invalidate(&self, id: &TrackId) {
        self.cache().remove(id);
    }

    fn invalidate_all(&self) {
        self.cache().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> SimulatedResolver {
        SimulatedResolver::new(Arc::new(Catalog::generate(1, 6)), 1)
    }

    #[tokio::test]
    async fn test_resolution_is_cached() {
        let resolver = resolver();
        let id = TrackId::new("t-001");
        assert!(!resolver.has_cached(&id));

        let data = resolver.resolve(&id, AudioQuality::Low).await.unwrap();
        assert_eq!(data.format.bitrate, 64);
        assert!(data.stream_url.starts_with("sim://"));
        assert!(resolver.has_cached(&id));

        let again = resolver.resolve(&id, AudioQuality::High).await.unwrap();
        assert_eq!(again, data);
    }

    #[tokio::test]
    async fn test_unknown_track_is_unavailable() {
        let result = resolver().resolve(&TrackId::new("x"), AudioQuality::High).await;
        assert_eq!(result, Err(ResolveError::Unavailable(TrackId::new("x"))));
    }

    #[tokio::test]
    async fn test_short_validity_is_never_cached() {
        let resolver = resolver().with_validity(20);
        let id = TrackId::new("t-002");
        let data = resolver.resolve(&id, AudioQuality::High).await.unwrap();
        assert!(!data.is_valid());
        assert!(!resolver.has_cached(&id));
    }

    #[tokio::test]
    async fn test_invalidation() {
        let resolver = resolver();
        resolver
            .prefetch(&[TrackId::new("t-000"), TrackId::new("t-001")], AudioQuality::High)
            .await;
        assert_eq!(resolver.cached_len(), 2);

        resolver.invalidate(&TrackId::new("t-000"));
        assert!(!resolver.has_cached(&TrackId::new("t-000")));
        assert!(resolver.has_cached(&TrackId::new("t-001")));

        resolver.invalidate_all();
        assert_eq!(resolver.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_full_failure_rate_always_fails() {
        let resolver = resolver().with_failure_rate(1.0);
        let result = resolver.resolve(&TrackId::new("t-003"), AudioQuality::High).await;
        assert!(matches!(result, Err(ResolveError::Network(_))));

        resolver.prefetch_next(&TrackId::new("t-003"), AudioQuality::High).await;
        assert_eq!(resolver.cached_len(), 0);
    }
}
