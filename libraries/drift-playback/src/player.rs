//! Player construction and the command handle

use crate::command::{Command, Message};
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::orchestrator::Orchestrator;
use crate::types::PlaybackState;
use drift_core::{AudioEngine, AudioQuality, CollectionId, LoopMode, RelatedTracksProvider, StreamResolver, Track};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// Playback engine, not yet running
///
/// Built from explicit collaborators; [`Player::start`] spawns the
/// orchestrator task and hands back the [`PlayerHandle`] that controls it.
pub struct Player {
    config: PlayerConfig,
    resolver: Arc<dyn StreamResolver>,
    engine: Arc<dyn AudioEngine>,
    related: Arc<dyn RelatedTracksProvider>,
}

impl Player {
    pub fn new(
        config: PlayerConfig,
        resolver: Arc<dyn StreamResolver>,
        engine: Arc<dyn AudioEngine>,
        related: Arc<dyn RelatedTracksProvider>,
    ) -> Self {
        Self {
            config,
            resolver,
            engine,
            related,
        }
    }

    /// Spawn the orchestrator on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start(self) -> PlayerHandle {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(Orchestrator::initial_state(&self.config));
        let (position_tx, position_rx) = watch::channel(Duration::ZERO);
        let engine_events = self.engine.subscribe();

        let orchestrator = Orchestrator::new(
            self.config,
            self.resolver,
            self.engine,
            self.related,
            inbox_tx.downgrade(),
            state_tx,
            position_tx,
        );
        tokio::spawn(orchestrator.run(inbox_rx, engine_events));

        PlayerHandle {
            inbox: inbox_tx,
            state: state_rx,
            position: position_rx,
        }
    }
}

/// Cloneable handle to a running player
///
/// Commands return once the orchestrator has applied them and published the
/// resulting state; background work they start (loading, prefetch, radio)
/// completes later and shows up on the state channel. Dropping every handle
/// shuts the player down.
#[derive(Clone)]
pub struct PlayerHandle {
    inbox: mpsc::UnboundedSender<Message>,
    state: watch::Receiver<PlaybackState>,
    position: watch::Receiver<Duration>,
}

impl PlayerHandle {
    async fn send(&self, command: Command) -> Result<()> {
        let (ack, applied) = oneshot::channel();
        self.inbox
            .send(Message::Command { command, ack })
            .map_err(|_| PlayerError::Shutdown)?;
        applied.await.map_err(|_| PlayerError::Shutdown)
    }

    // ===== Queue =====

    /// Play a single track, optionally as the seed of a radio session
    pub async fn play_track(&self, track: Track, enable_radio: bool) -> Result<()> {
        self.send(Command::PlayTrack { track, enable_radio }).await
    }

    /// Replace the queue and start at `start_index`
    ///
    /// Disables radio unless `source_id` continues the running radio session.
    pub async fn play_queue(
        &self,
        tracks: Vec<Track>,
        start_index: usize,
        source_id: Option<CollectionId>,
    ) -> Result<()> {
        self.send(Command::PlayQueue {
            tracks,
            start_index,
            source_id,
        })
        .await
    }

    pub async fn add_to_queue(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(Command::AddToQueue(tracks)).await
    }

    pub async fn play_next(&self, track: Track) -> Result<()> {
        self.send(Command::PlayNext(track)).await
    }

    pub async fn remove_at(&self, index: usize) -> Result<()> {
        self.send(Command::RemoveAt(index)).await
    }

    pub async fn reorder(&self, from: usize, to: usize) -> Result<()> {
        self.send(Command::Reorder { from, to }).await
    }

    pub async fn skip_to_index(&self, index: usize) -> Result<()> {
        self.send(Command::SkipToIndex(index)).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.send(Command::Clear).await
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.send(Command::ToggleShuffle).await
    }

    pub async fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetShuffle(enabled)).await
    }

    pub async fn set_loop_mode(&self, mode: LoopMode) -> Result<()> {
        self.send(Command::SetLoopMode(mode)).await
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        self.send(Command::SkipToNext).await
    }

    /// Restart the current track after the restart threshold, otherwise go back
    pub async fn skip_to_previous(&self) -> Result<()> {
        self.send(Command::SkipToPrevious).await
    }

    // ===== Transport =====

    /// Resume, or retry a failed load
    pub async fn play(&self) -> Result<()> {
        self.send(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    pub async fn seek(&self, position: Duration) -> Result<()> {
        self.send(Command::Seek(position)).await
    }

    pub async fn set_speed(&self, speed: f32) -> Result<()> {
        self.send(Command::SetSpeed(speed)).await
    }

    /// Change the quality preference; drops every cached resolution
    pub async fn set_audio_quality(&self, quality: AudioQuality) -> Result<()> {
        self.send(Command::SetAudioQuality(quality)).await
    }

    // ===== Observation =====

    /// Latest published state
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    /// Subscribe to state snapshots; the latest one is available immediately
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    /// Subscribe to unthrottled position updates
    pub fn subscribe_position(&self) -> watch::Receiver<Duration> {
        self.position.clone()
    }

    /// Stop the engine, cancel background work and end the orchestrator
    pub async fn shutdown(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.inbox
            .send(Message::Shutdown { ack })
            .map_err(|_| PlayerError::Shutdown)?;
        done.await.map_err(|_| PlayerError::Shutdown)
    }
}
