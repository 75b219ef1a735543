/// Collaborator error types
use crate::types::TrackId;
use thiserror::Error;

/// Stream resolution failure
///
/// Timeouts and failures are equivalent to the player: both mean "no usable
/// result".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Track is not available for streaming
    #[error("Track not available: {0}")]
    Unavailable(TrackId),

    /// Network failure while resolving
    #[error("Network error: {0}")]
    Network(String),

    /// Resolution timed out
    #[error("Resolution timed out")]
    Timeout,

    /// Every resolution strategy was tried and failed
    #[error("All resolution strategies failed: {0}")]
    Exhausted(String),
}

impl ResolveError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an exhausted error
    pub fn exhausted(msg: impl Into<String>) -> Self {
        Self::Exhausted(msg.into())
    }
}

/// Audio engine failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Source could not be opened
    #[error("Source rejected: {0}")]
    Source(String),

    /// I/O failure while playing
    #[error("Playback I/O error: {0}")]
    Io(String),

    /// Engine is not in a state to accept the command
    #[error("Invalid engine state: {0}")]
    InvalidState(String),
}

impl EngineError {
    /// Create a source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create an I/O error
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

/// Related-tracks fetch failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network failure
    #[error("Network error: {0}")]
    Network(String),

    /// Fetch timed out
    #[error("Fetch timed out")]
    Timeout,

    /// Provider answered with something unusable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }
}
