/// Resolved stream descriptors
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the advertised expiry at which resolved data stops being used
pub const VALIDITY_SAFETY_MARGIN: i64 = 30;

/// Stream format descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    /// MIME type of the stream (e.g. "audio/ogg")
    pub mime_type: String,

    /// Bitrate in kbit/s
    pub bitrate: u32,

    /// Codec name, when the container does not imply it
    pub codec: Option<String>,
}

impl StreamFormat {
    /// Create a format descriptor without codec information
    pub fn new(mime_type: impl Into<String>, bitrate: u32) -> Self {
        Self {
            mime_type: mime_type.into(),
            bitrate,
            codec: None,
        }
    }

    /// Set the codec name
    #[must_use]
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }
}

/// Result of a successful stream resolution
///
/// Immutable once produced. Expired data is superseded by a fresh resolution,
/// never refreshed in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackData {
    /// Stream URL handed to the audio engine
    pub stream_url: String,

    /// Format of the stream
    pub format: StreamFormat,

    /// When the data was resolved
    pub fetched_at: DateTime<Utc>,

    /// Advertised validity window in seconds
    pub validity_secs: u64,
}

impl PlaybackData {
    /// Create playback data fetched now
    pub fn new(stream_url: impl Into<String>, format: StreamFormat, validity_secs: u64) -> Self {
        Self::fetched_at(stream_url, format, Utc::now(), validity_secs)
    }

    /// Create playback data with an explicit fetch timestamp
    pub fn fetched_at(
        stream_url: impl Into<String>,
        format: StreamFormat,
        fetched_at: DateTime<Utc>,
        validity_secs: u64,
    ) -> Self {
        Self {
            stream_url: stream_url.into(),
            format,
            fetched_at,
            validity_secs,
        }
    }

    /// Instant after which the data must not be used (expiry minus safety margin)
    pub fn usable_until(&self) -> DateTime<Utc> {
        let usable_secs = i64::try_from(self.validity_secs)
            .unwrap_or(i64::MAX)
            .saturating_sub(VALIDITY_SAFETY_MARGIN);
        chrono::Duration::try_seconds(usable_secs)
            .and_then(|window| self.fetched_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the data is still usable at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.usable_until()
    }

    /// Whether the data is still usable
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
