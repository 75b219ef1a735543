//! Player configuration

use crate::error::{PlayerError, Result};
use drift_core::{AudioQuality, LoopMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Player configuration
///
/// Every tunable of the orchestrator, prefetch pipeline and radio extension.
/// Deserializes from partial input; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Initial audio quality preference (default: high)
    pub audio_quality: AudioQuality,

    /// Initial loop mode (default: off)
    pub loop_mode: LoopMode,

    /// Initial shuffle flag (default: false)
    pub shuffle: bool,

    /// Remaining time on the current track at which the next track is
    /// prefetched, in seconds (default: 30)
    pub prefetch_threshold_secs: u64,

    /// Elapsed time after which "previous" restarts the current track, in
    /// seconds (default: 3)
    pub restart_threshold_secs: u64,

    /// Minimum interval between full-state broadcasts caused by position
    /// updates, in milliseconds (default: 500)
    pub position_publish_interval_ms: u64,

    /// Local files smaller than this are treated as corrupted (default: 10 KiB)
    pub min_local_file_bytes: u64,

    /// Radio extension settings
    pub radio: RadioConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio_quality: AudioQuality::default(),
            loop_mode: LoopMode::default(),
            shuffle: false,
            prefetch_threshold_secs: 30,
            restart_threshold_secs: 3,
            position_publish_interval_ms: 500,
            min_local_file_bytes: 10 * 1024,
            radio: RadioConfig::default(),
        }
    }
}

impl PlayerConfig {
    pub fn prefetch_threshold(&self) -> Duration {
        Duration::from_secs(self.prefetch_threshold_secs)
    }

    pub fn restart_threshold(&self) -> Duration {
        Duration::from_secs(self.restart_threshold_secs)
    }

    pub fn position_publish_interval(&self) -> Duration {
        Duration::from_millis(self.position_publish_interval_ms)
    }

    /// Reject settings the player cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.radio.batch_size == 0 {
            return Err(PlayerError::InvalidConfig(
                "radio.batch_size must be at least 1".to_string(),
            ));
        }
        if self.radio.max_queue_len == 0 {
            return Err(PlayerError::InvalidConfig(
                "radio.max_queue_len must be at least 1".to_string(),
            ));
        }
        if self.position_publish_interval_ms == 0 {
            return Err(PlayerError::InvalidConfig(
                "position_publish_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Radio extension settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Extend when this many tracks or fewer remain after the current one
    /// (default: 5)
    pub low_watermark: usize,

    /// A fresh session with this many tracks or fewer fetches immediately
    /// (default: 2)
    pub fresh_session_max: usize,

    /// Tracks requested per fetch (default: 20)
    pub batch_size: usize,

    /// Hard bound on queue length while radio is extending (default: 500)
    pub max_queue_len: usize,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            low_watermark: 5,
            fresh_session_max: 2,
            batch_size: 20,
            max_queue_len: 500,
        }
    }
}
