/// Track domain type
use crate::types::TrackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Playable track
///
/// Tracks are immutable values. Identity is by `id`; the player never compares
/// whole values when deciding whether two entries are the same track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: Option<String>,

    /// Track duration in milliseconds (0 when unknown)
    pub duration_ms: u64,

    /// Thumbnail reference (URL or cache key)
    pub thumbnail: Option<String>,

    /// Downloaded copy on disk, preferred over streaming when usable
    pub local_path: Option<PathBuf>,

    /// Whether the listener liked this track
    #[serde(default)]
    pub liked: bool,

    /// When the track was added to the listener's library
    pub added_at: Option<DateTime<Utc>>,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_ms: duration.as_millis() as u64,
            thumbnail: None,
            local_path: None,
            liked: false,
            added_at: None,
        }
    }

    /// Set the album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the thumbnail reference
    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// Attach a downloaded copy
    #[must_use]
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Get the track duration, `None` when unknown
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_ms > 0).then(|| Duration::from_millis(self.duration_ms))
    }

    /// Downloaded copy, if any
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    /// Identity comparison
    pub fn is_same_track(&self, other: &Track) -> bool {
        self.id == other.id
    }
}
