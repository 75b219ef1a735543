//! Published playback state

use crate::error::PlayerError;
use drift_core::{AudioQuality, CollectionId, LoopMode, PlaybackData, Track};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing loaded, or playback settled
    #[default]
    Idle,

    /// Resolving and loading the current track
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Playing but waiting for data
    Buffering,

    /// Last load or playback failed; see `PlaybackState::error`
    Error,

    /// End of stream reached; routed immediately by the completion policy
    Completed,
}

impl PlaybackStatus {
    /// Whether the listener expects sound (or sound is about to start)
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Playing | Self::Buffering)
    }
}

/// Snapshot published on every meaningful transition
///
/// Equality ignores `position` and `buffered_position` so that position
/// ticks do not count as state changes.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub current_track: Option<Track>,
    pub queue: Arc<Vec<Track>>,
    pub revision: u64,
    pub current_index: Option<usize>,
    pub source_id: Option<CollectionId>,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub is_loading: bool,
    pub position: Duration,
    pub buffered_position: Duration,
    pub duration: Option<Duration>,
    pub speed: f32,
    pub loop_mode: LoopMode,
    pub shuffle: bool,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<PlayerError>,
    pub audio_quality: AudioQuality,
    pub playback_data: Option<PlaybackData>,
    pub radio_mode: bool,
    pub radio_fetching: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            current_track: None,
            queue: Arc::default(),
            revision: 0,
            current_index: None,
            source_id: None,
            is_playing: false,
            is_buffering: false,
            is_loading: false,
            position: Duration::ZERO,
            buffered_position: Duration::ZERO,
            duration: None,
            speed: 1.0,
            loop_mode: LoopMode::Off,
            shuffle: false,
            error: None,
            audio_quality: AudioQuality::default(),
            playback_data: None,
            radio_mode: false,
            radio_fetching: false,
        }
    }
}

impl PlaybackState {
    /// Whether a track follows the current one
    pub fn has_next(&self) -> bool {
        match self.current_index {
            Some(index) => index + 1 < self.queue.len() || self.loop_mode == LoopMode::All,
            None => false,
        }
    }

    /// Whether a track precedes the current one
    pub fn has_previous(&self) -> bool {
        match self.current_index {
            Some(index) => index > 0 || self.loop_mode == LoopMode::All,
            None => false,
        }
    }

    /// Tracks left after the current one
    pub fn remaining_in_queue(&self) -> usize {
        match self.current_index {
            Some(index) => self.queue.len().saturating_sub(index + 1),
            None => 0,
        }
    }
}

impl PartialEq for PlaybackState {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.current_track == other.current_track
            && self.revision == other.revision
            && (Arc::ptr_eq(&self.queue, &other.queue) || self.queue == other.queue)
            && self.current_index == other.current_index
            && self.source_id == other.source_id
            && self.is_playing == other.is_playing
            && self.is_buffering == other.is_buffering
            && self.is_loading == other.is_loading
            && self.duration == other.duration
            && self.speed == other.speed
            && self.loop_mode == other.loop_mode
            && self.shuffle == other.shuffle
            && self.error == other.error
            && self.audio_quality == other.audio_quality
            && self.playback_data == other.playback_data
            && self.radio_mode == other.radio_mode
            && self.radio_fetching == other.radio_fetching
    }
}

fn serialize_error<S: Serializer>(error: &Option<PlayerError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
