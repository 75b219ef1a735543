//! Error types for playback orchestration

use drift_core::{EngineError, FetchError, ResolveError, TrackId};
use std::path::PathBuf;
use thiserror::Error;

/// Playback errors
///
/// Every variant is absorbed at the player boundary: it either ends up in
/// `PlaybackState::error`, becomes a silent fallback, or is logged and
/// dropped as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    /// Local copy and every remote strategy failed
    #[error("Could not resolve a stream for track {track_id}: {source}")]
    ResolutionExhausted {
        track_id: TrackId,
        source: ResolveError,
    },

    /// Engine failed while loading or playing
    #[error("Playback failed for track {track_id}: {source}")]
    EngineIo {
        track_id: TrackId,
        source: EngineError,
    },

    /// Downloaded copy is too small to be a real audio file
    #[error("Local file {} is too small ({size} bytes)", .path.display())]
    LocalFileCorrupted { path: PathBuf, size: u64 },

    /// Downloaded copy cannot be used
    #[error("Local file {} is unavailable: {reason}", .path.display())]
    LocalFileUnavailable { path: PathBuf, reason: String },

    /// Related-tracks provider failed
    #[error("Radio fetch failed for seed {seed}: {source}")]
    RadioFetchFailed { seed: TrackId, source: FetchError },

    /// Queue is empty
    #[error("Queue is empty")]
    QueueOperationOnEmptyQueue,

    /// Index out of range
    #[error("Index out of range: {index} (queue length {len})")]
    OutOfRangeIndex { index: usize, len: usize },

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Player task is gone
    #[error("Player has shut down")]
    Shutdown,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_file_errors_display_path() {
        let err = PlayerError::LocalFileCorrupted {
            path: PathBuf::from("/music/a.opus"),
            size: 512,
        };
        assert_eq!(err.to_string(), "Local file /music/a.opus is too small (512 bytes)");
    }

    #[test]
    fn collaborator_errors_are_chained_as_source() {
        use std::error::Error as _;

        let err = PlayerError::ResolutionExhausted {
            track_id: TrackId::new("t1"),
            source: ResolveError::Timeout,
        };
        assert_eq!(err.source().map(|s| s.to_string()), Some("Resolution timed out".to_string()));
    }
}
