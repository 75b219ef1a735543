//! Drift Core
//!
//! Domain types, collaborator contracts, and collaborator error types for the
//! Drift streaming playback engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `TrackId`, `PlaybackData`, `AudioQuality`, `LoopMode`
//! - **Collaborator Traits**: `StreamResolver`, `AudioEngine`, `RelatedTracksProvider`
//! - **Engine Events**: the push-stream an `AudioEngine` exposes to the player
//! - **Error Handling**: `ResolveError`, `EngineError`, `FetchError`
//!
//! # Example
//!
//! ```rust
//! use drift_core::types::{PlaybackData, StreamFormat, Track};
//! use std::time::Duration;
//!
//! let track = Track::new("t-1", "Harbour Lights", "The Tides", Duration::from_secs(214))
//!     .with_album("Low Water");
//!
//! let data = PlaybackData::new(
//!     "https://cdn.example.com/t-1.opus",
//!     StreamFormat::new("audio/ogg", 160).with_codec("opus"),
//!     3600,
//! );
//! assert!(data.is_valid());
//! assert_eq!(track.id.as_str(), "t-1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{EngineError, FetchError, ResolveError};
pub use traits::{AudioEngine, RelatedTracksProvider, StreamResolver};
pub use types::*;
