//! Push-stream events emitted by an audio engine

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingState {
    /// No source loaded
    Idle,

    /// Source is being opened
    Loading,

    /// Waiting for more data
    Buffering,

    /// Enough data to play
    Ready,

    /// End of stream reached
    Completed,
}

/// Event pushed by the engine
///
/// All of the engine's push-streams (player state, position, buffered
/// position, duration, terminal errors) are multiplexed onto one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Player state changed
    PlayerState {
        /// Whether the engine intends to play
        playing: bool,
        /// Current processing state
        processing: ProcessingState,
    },

    /// Playback position update
    Position(Duration),

    /// Buffered position update
    BufferedPosition(Duration),

    /// Duration of the loaded source became known (or unknown)
    Duration(Option<Duration>),

    /// Terminal error; the current source is unusable
    Error(EngineError),
}

impl EngineEvent {
    /// Shorthand for a player-state event
    pub fn state(playing: bool, processing: ProcessingState) -> Self {
        Self::PlayerState {
            playing,
            processing,
        }
    }

    /// End-of-stream event
    pub fn completed() -> Self {
        Self::state(true, ProcessingState::Completed)
    }
}
