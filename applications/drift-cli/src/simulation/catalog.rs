//! Generated track catalog and the related-tracks provider backed by it

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use drift_core::{FetchError, RelatedTracksProvider, Track, TrackId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const ARTISTS: &[&str] = &[
    "The Tides",
    "Low Orbit",
    "Marisol Vega",
    "Paper Lanterns",
    "Northbound",
    "Kite Season",
    "Quiet Engines",
    "Juno Hart",
];

const WORDS: &[&str] = &[
    "Harbour", "Lights", "Static", "Summer", "Glass", "River", "Echo", "Velvet", "Signal",
    "Morning", "Cinder", "Parallel", "Drift", "Hollow", "Neon", "Meridian", "Fable", "Tide",
];

/// Fixed set of tracks grouped by artist
#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    index: HashMap<TrackId, usize>,
    latency: Duration,
}

impl Catalog {
    /// Generate `size` tracks deterministically from `seed`
    pub fn generate(seed: u64, size: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let now = Utc::now();

        let tracks = (0..size)
            .map(|i| {
                let artist = ARTISTS[i % ARTISTS.len()];
                let title = format!(
                    "{} {}",
                    WORDS.choose(&mut rng).copied().unwrap_or("Untitled"),
                    WORDS.choose(&mut rng).copied().unwrap_or("Song"),
                );
                let mut track = Track::new(
                    format!("t-{i:03}"),
                    title,
                    artist,
                    Duration::from_secs(rng.gen_range(150..=330)),
                )
                .with_album(format!("{artist} Sessions Vol. {}", i / ARTISTS.len() + 1));
                track.added_at = Some(now - ChronoDuration::days(i as i64));
                track
            })
            .collect();

        Self::from_tracks(tracks)
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let index = tracks
            .iter()
            .enumerate()
            .map(|(i, track)| (track.id.clone(), i))
            .collect();
        Self {
            tracks,
            index,
            latency: Duration::ZERO,
        }
    }

    /// Delay every related-tracks answer by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Point every track at `<dir>/<id>.opus`; missing files fall back to streaming
    #[must_use]
    pub fn with_downloads(mut self, dir: &Path) -> Self {
        for track in &mut self.tracks {
            track.local_path = Some(dir.join(format!("{}.opus", track.id)));
        }
        self
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.index.get(id).map(|&i| &self.tracks[i])
    }

    pub fn duration_of(&self, id: &TrackId) -> Option<Duration> {
        self.get(id).and_then(Track::duration)
    }

    /// Tracks related to `seed`: same artist first, then catalog neighbours
    pub fn related(&self, seed: &TrackId, limit: usize) -> Vec<Track> {
        let Some(&start) = self.index.get(seed) else {
            return Vec::new();
        };
        let artist = &self.tracks[start].artist;
        let rotated = self.tracks[start + 1..]
            .iter()
            .chain(&self.tracks[..start])
            .filter(|track| track.id != *seed);

        let (same, other): (Vec<&Track>, Vec<&Track>) =
            rotated.partition(|track| track.artist == *artist);
        same.into_iter()
            .chain(other)
            .take(limit)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RelatedTracksProvider for Catalog {
    async fn fetch_related(&self, seed: &TrackId, limit: usize) -> Result<Vec<Track>, FetchError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.index.contains_key(seed) {
            return Err(FetchError::InvalidResponse(format!("unknown seed {seed}")));
        }
        let related = self.related(seed, limit);
        tracing::debug!(seed = %seed, count = related.len(), "related tracks");
        Ok(related)
    }
}
