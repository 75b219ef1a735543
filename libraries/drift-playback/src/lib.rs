//! Drift - Playback Orchestration
//!
//! Streaming playback engine core for Drift.
//!
//! This crate provides:
//! - Queue model (ordered tracks, cursor, shuffle with undo, loop modes)
//! - Playback orchestrator (state machine driving resolver and audio engine)
//! - Prefetch pipeline (queue warm-up, next-track prefetch)
//! - Radio extension (open-ended queues fed by related tracks)
//! - Local-file preference with streaming fallback
//!
//! # Architecture
//!
//! `drift-playback` never talks to the network, the filesystem (beyond a
//! metadata probe of downloaded copies) or an audio device directly. The
//! collaborators are traits from `drift-core`:
//! - `StreamResolver` turns track ids into stream URLs
//! - `AudioEngine` plays URIs and pushes events back
//! - `RelatedTracksProvider` feeds radio mode
//!
//! The orchestrator is a single tokio task owning all mutable state. It is
//! driven through a cloneable [`PlayerHandle`] and publishes
//! [`PlaybackState`] snapshots on a watch channel.
//!
//! # Example
//!
//! ```rust,no_run
//! use drift_core::{AudioEngine, RelatedTracksProvider, StreamResolver, Track};
//! use drift_playback::{Player, PlayerConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! async fn listen(
//!     resolver: Arc<dyn StreamResolver>,
//!     engine: Arc<dyn AudioEngine>,
//!     related: Arc<dyn RelatedTracksProvider>,
//! ) -> drift_playback::Result<()> {
//!     let player = Player::new(PlayerConfig::default(), resolver, engine, related).start();
//!
//!     let seed = Track::new("t-1", "Harbour Lights", "The Tides", Duration::from_secs(214));
//!     player.play_track(seed, true).await?;
//!
//!     let mut states = player.subscribe();
//!     while states.changed().await.is_ok() {
//!         let state = states.borrow().clone();
//!         println!("{:?} {:?}", state.status, state.current_track.map(|t| t.title));
//!     }
//!
//!     player.shutdown().await
//! }
//! ```

#![forbid(unsafe_code)]

mod command;
pub mod config;
pub mod error;
mod orchestrator;
mod player;
pub mod prefetch;
pub mod queue;
mod radio;
pub mod shuffle;
pub mod source;
mod supervisor;
pub mod types;

pub use config::{PlayerConfig, RadioConfig};
pub use error::{PlayerError, Result};
pub use player::{Player, PlayerHandle};
pub use queue::{Queue, Removal};
pub use types::{PlaybackState, PlaybackStatus};
