//! Source selection: downloaded copy first, stream resolution second

use crate::error::{PlayerError, Result};
use drift_core::{AudioQuality, PlaybackData, StreamResolver, Track};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Source handed to the audio engine
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedSource {
    /// Downloaded copy on disk
    Local { path: PathBuf, uri: String },

    /// Resolved stream
    Remote(PlaybackData),
}

impl LoadedSource {
    /// URI the engine should open
    pub fn uri(&self) -> &str {
        match self {
            Self::Local { uri, .. } => uri,
            Self::Remote(data) => &data.stream_url,
        }
    }

    /// Stream descriptor, for remote sources
    pub fn into_playback_data(self) -> Option<PlaybackData> {
        match self {
            Self::Local { .. } => None,
            Self::Remote(data) => Some(data),
        }
    }
}

/// Check that a downloaded copy is usable and build its `file://` URI
///
/// Files smaller than `min_bytes` are treated as corrupted.
pub async fn probe_local_file(path: &Path, min_bytes: u64) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| PlayerError::LocalFileUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !metadata.is_file() {
        return Err(PlayerError::LocalFileUnavailable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    if metadata.len() < min_bytes {
        return Err(PlayerError::LocalFileCorrupted {
            path: path.to_path_buf(),
            size: metadata.len(),
        });
    }

    Url::from_file_path(path)
        .map(|url| url.to_string())
        .map_err(|()| PlayerError::LocalFileUnavailable {
            path: path.to_path_buf(),
            reason: "path is not absolute".to_string(),
        })
}

/// Pick the source for `track`
///
/// A usable downloaded copy wins. Otherwise the resolver is asked; resolved
/// data that is already past its validity window is invalidated and
/// resolved once more.
pub async fn load_source(
    resolver: &dyn StreamResolver,
    track: &Track,
    quality: AudioQuality,
    min_local_bytes: u64,
) -> Result<LoadedSource> {
    if let Some(path) = track.local_path() {
        match probe_local_file(path, min_local_bytes).await {
            Ok(uri) => {
                debug!(track_id = %track.id, path = %path.display(), "playing downloaded copy");
                return Ok(LoadedSource::Local {
                    path: path.to_path_buf(),
                    uri,
                });
            }
            Err(err @ PlayerError::LocalFileCorrupted { .. }) => {
                warn!(track_id = %track.id, error = %err, "downloaded copy looks corrupted, streaming instead");
            }
            Err(err) => {
                debug!(track_id = %track.id, error = %err, "downloaded copy unusable, streaming instead");
            }
        }
    }

    let resolve_error = |source| PlayerError::ResolutionExhausted {
        track_id: track.id.clone(),
        source,
    };

    let data = resolver.resolve(&track.id, quality).await.map_err(resolve_error)?;
    if data.is_valid() {
        return Ok(LoadedSource::Remote(data));
    }

    debug!(track_id = %track.id, "resolved stream already expired, resolving again");
    resolver.invalidate(&track.id);
    resolver
        .resolve(&track.id, quality)
        .await
        .map(LoadedSource::Remote)
        .map_err(resolve_error)
}
