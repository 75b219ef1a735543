//! Messages folded into the orchestrator
//!
//! User commands and background completions share one inbox so that every
//! mutation happens on the orchestrator task, one message at a time.

use crate::error::Result;
use crate::source::LoadedSource;
use drift_core::{AudioQuality, CollectionId, FetchError, LoopMode, Track, TrackId};
use std::time::Duration;
use tokio::sync::oneshot;

/// User command
#[derive(Debug, Clone)]
pub(crate) enum Command {
    PlayTrack { track: Track, enable_radio: bool },
    PlayQueue {
        tracks: Vec<Track>,
        start_index: usize,
        source_id: Option<CollectionId>,
    },
    AddToQueue(Vec<Track>),
    PlayNext(Track),
    RemoveAt(usize),
    Reorder { from: usize, to: usize },
    SkipToIndex(usize),
    Clear,
    ToggleShuffle,
    SetShuffle(bool),
    SetLoopMode(LoopMode),
    SkipToNext,
    SkipToPrevious,
    Play,
    Pause,
    Stop,
    Seek(Duration),
    SetSpeed(f32),
    SetAudioQuality(AudioQuality),
}

/// Inbox message
#[derive(Debug)]
pub(crate) enum Message {
    /// User command; acknowledged once applied and published
    Command {
        command: Command,
        ack: oneshot::Sender<()>,
    },

    /// Source load finished for the load dispatched at `generation`
    Resolved {
        generation: u64,
        track_id: TrackId,
        outcome: Result<LoadedSource>,
    },

    /// Radio fetch finished
    RadioFetched {
        token: u64,
        seed: TrackId,
        outcome: std::result::Result<Vec<Track>, FetchError>,
    },

    /// Queue prefetch batch finished
    PrefetchFinished { token: u64 },

    /// Stop the orchestrator
    Shutdown { ack: oneshot::Sender<()> },
}
