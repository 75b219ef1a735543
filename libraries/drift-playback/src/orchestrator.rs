//! Playback orchestrator
//!
//! The single owner of queue and playback state. Runs as one tokio task and
//! handles, one at a time:
//! - user commands and background completions from the inbox
//! - events pushed by the audio engine
//!
//! Every handled message ends with a snapshot published on the state channel.
//! Background loads carry the generation they were dispatched at; results for
//! an older generation are dropped on arrival.

use crate::command::{Command, Message};
use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::prefetch::PrefetchPipeline;
use crate::queue::{Queue, Removal};
use crate::radio::RadioExtension;
use crate::source::{load_source, LoadedSource};
use crate::types::{PlaybackState, PlaybackStatus};
use drift_core::{
    AudioEngine, AudioQuality, CollectionId, EngineError, EngineEvent, FetchError, LoopMode, PlaybackData,
    ProcessingState, RelatedTracksProvider, StreamResolver, Track, TrackId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub(crate) struct Orchestrator {
    config: PlayerConfig,
    resolver: Arc<dyn StreamResolver>,
    engine: Arc<dyn AudioEngine>,
    inbox: mpsc::WeakUnboundedSender<Message>,
    state_tx: watch::Sender<PlaybackState>,
    position_tx: watch::Sender<Duration>,

    queue: Queue,
    queue_snapshot: Arc<Vec<Track>>,
    snapshot_revision: Option<u64>,

    status: PlaybackStatus,
    /// Start playing as soon as the pending load succeeds
    play_when_ready: bool,
    generation: u64,
    position: Duration,
    buffered_position: Duration,
    duration: Option<Duration>,
    speed: f32,
    error: Option<PlayerError>,
    audio_quality: AudioQuality,
    playback_data: Option<PlaybackData>,
    /// Submit the queue for prefetch after the next successful load
    prefetch_queue_on_load: bool,
    /// A command moved the position; the next publish must carry it
    position_moved: bool,
    last_position_publish: Instant,

    prefetch: PrefetchPipeline,
    radio: RadioExtension,
}

impl Orchestrator {
    pub(crate) fn new(
        config: PlayerConfig,
        resolver: Arc<dyn StreamResolver>,
        engine: Arc<dyn AudioEngine>,
        related: Arc<dyn RelatedTracksProvider>,
        inbox: mpsc::WeakUnboundedSender<Message>,
        state_tx: watch::Sender<PlaybackState>,
        position_tx: watch::Sender<Duration>,
    ) -> Self {
        let prefetch = PrefetchPipeline::new(resolver.clone(), inbox.clone(), config.prefetch_threshold());
        let radio = RadioExtension::new(related, inbox.clone(), config.radio.clone());
        Self {
            queue: Queue::with_modes(config.loop_mode, config.shuffle),
            queue_snapshot: Arc::default(),
            snapshot_revision: None,
            status: PlaybackStatus::Idle,
            play_when_ready: false,
            generation: 0,
            position: Duration::ZERO,
            buffered_position: Duration::ZERO,
            duration: None,
            speed: 1.0,
            error: None,
            audio_quality: config.audio_quality,
            playback_data: None,
            prefetch_queue_on_load: false,
            position_moved: false,
            last_position_publish: Instant::now(),
            config,
            resolver,
            engine,
            inbox,
            state_tx,
            position_tx,
            prefetch,
            radio,
        }
    }

    /// Snapshot the orchestrator would publish right now
    pub(crate) fn initial_state(config: &PlayerConfig) -> PlaybackState {
        PlaybackState {
            loop_mode: config.loop_mode,
            shuffle: config.shuffle,
            audio_quality: config.audio_quality,
            ..PlaybackState::default()
        }
    }

    pub(crate) async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<Message>,
        engine_events: broadcast::Receiver<EngineEvent>,
    ) {
        // Looping is handled here, never by the engine.
        if let Err(err) = self.engine.set_loop_mode(LoopMode::Off).await {
            warn!(error = %err, "engine rejected loop mode");
        }

        let mut engine_events = Some(engine_events);
        info!("playback orchestrator started");

        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(Message::Shutdown { ack }) => {
                        self.shutdown().await;
                        let _ = ack.send(());
                        break;
                    }
                    Some(message) => self.handle_message(message).await,
                    None => {
                        debug!("every player handle dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                Some(event) = next_engine_event(&mut engine_events) => {
                    self.handle_engine_event(event).await;
                }
            }
        }

        info!("playback orchestrator stopped");
    }

    async fn handle_message(&mut self, message: Message) {
        match message {
            Message::Command { command, ack } => {
                self.apply(command).await;
                self.publish();
                let _ = ack.send(());
            }
            Message::Resolved {
                generation,
                track_id,
                outcome,
            } => {
                self.on_resolved(generation, track_id, outcome).await;
                self.publish();
            }
            Message::RadioFetched { token, seed, outcome } => {
                self.on_radio_fetched(token, seed, outcome).await;
                self.publish();
            }
            Message::PrefetchFinished { token } => self.prefetch.finish(token),
            Message::Shutdown { ack } => {
                let _ = ack.send(());
            }
        }
    }

    // ===== Commands =====

    async fn apply(&mut self, command: Command) {
        match command {
            Command::PlayTrack { track, enable_radio } => self.play_track(track, enable_radio).await,
            Command::PlayQueue {
                tracks,
                start_index,
                source_id,
            } => self.play_queue(tracks, start_index, source_id).await,
            Command::AddToQueue(tracks) => {
                self.radio.extend_seen(&tracks);
                let added = self.queue.append(tracks);
                debug!(added, revision = self.queue.revision(), "tracks appended");
            }
            Command::PlayNext(track) => {
                self.radio.extend_seen([&track]);
                self.queue.insert_next(track);
            }
            Command::RemoveAt(index) => {
                match self.queue.remove_at(index) {
                    Ok(removal) if removal.was_current => self.on_current_removed(removal).await,
                    Ok(removal) => debug!(track_id = %removal.track.id, "track removed"),
                    Err(err) => debug!(error = %err, "ignoring removal"),
                }
                self.check_radio_watermark();
            }
            Command::Reorder { from, to } => {
                if let Err(err) = self.queue.reorder(from, to) {
                    debug!(error = %err, "ignoring reorder");
                }
                self.check_radio_watermark();
            }
            Command::SkipToIndex(index) => self.skip_to(index).await,
            Command::Clear => {
                self.radio.disable();
                self.prefetch.cancel();
                match self.queue.clear() {
                    Ok(()) => self.halt().await,
                    Err(err) => debug!(error = %err, "ignoring clear"),
                }
            }
            Command::ToggleShuffle => {
                self.queue.toggle_shuffle();
            }
            Command::SetShuffle(enabled) => {
                if self.queue.is_shuffled() != enabled {
                    self.queue.toggle_shuffle();
                }
            }
            Command::SetLoopMode(mode) => self.queue.set_loop_mode(mode),
            Command::SkipToNext => match self.queue.next_index() {
                Some(index) => self.skip_to(index).await,
                None => debug!("no next track"),
            },
            Command::SkipToPrevious => self.skip_to_previous().await,
            Command::Play => self.play().await,
            Command::Pause => self.pause().await,
            Command::Stop => self.halt().await,
            Command::Seek(position) => self.seek(position).await,
            Command::SetSpeed(speed) => self.set_speed(speed).await,
            Command::SetAudioQuality(quality) => {
                if quality != self.audio_quality {
                    info!(from = %self.audio_quality, to = %quality, "audio quality changed, dropping resolver cache");
                    self.audio_quality = quality;
                    self.resolver.invalidate_all();
                }
            }
        }
    }

    async fn play_track(&mut self, track: Track, enable_radio: bool) {
        info!(track_id = %track.id, enable_radio, "play track");
        self.prefetch.cancel();
        self.prefetch_queue_on_load = false;

        let source_id = enable_radio.then(|| CollectionId::radio(&track.id));
        if enable_radio {
            self.radio.start_session(&track);
        } else {
            self.radio.disable();
        }
        self.queue.replace(vec![track], 0, source_id);
        self.begin_load(true).await;

        if self.radio.should_extend(&self.queue, true) {
            self.radio.request(&self.queue);
        }
    }

    async fn play_queue(
        &mut self,
        tracks: Vec<Track>,
        start_index: usize,
        source_id: Option<CollectionId>,
    ) {
        if tracks.is_empty() {
            debug!("ignoring empty queue");
            return;
        }

        let continuation =
            self.radio.is_enabled() && source_id.is_some() && source_id.as_ref() == self.queue.source_id();
        if continuation {
            self.radio.cancel();
            self.radio.extend_seen(&tracks);
        } else {
            self.radio.disable();
        }
        info!(
            count = tracks.len(),
            start_index,
            source_id = ?source_id,
            continuation,
            "play queue"
        );

        self.prefetch.cancel();
        self.queue.replace(tracks, start_index, source_id);
        self.prefetch_queue_on_load = true;
        self.begin_load(true).await;

        if continuation && self.radio.should_extend(&self.queue, true) {
            self.radio.request(&self.queue);
        }
    }

    async fn skip_to(&mut self, index: usize) {
        match self.queue.set_current(index) {
            Ok(()) => self.begin_load(true).await,
            Err(err) => debug!(error = %err, "ignoring skip"),
        }
    }

    async fn skip_to_previous(&mut self) {
        if self.queue.current().is_some() && self.position > self.config.restart_threshold() {
            self.restart_current().await;
            return;
        }
        match self.queue.previous_index() {
            Some(index) => self.skip_to(index).await,
            None => debug!("no previous track"),
        }
    }

    async fn on_current_removed(&mut self, removal: Removal) {
        debug!(track_id = %removal.track.id, "current track removed");
        if self.queue.is_empty() || !removal.has_successor {
            self.halt().await;
            return;
        }
        if self.status.is_active() {
            self.begin_load(true).await;
        } else if self.status == PlaybackStatus::Paused {
            self.begin_load(false).await;
        }
    }

    async fn play(&mut self) {
        match self.status {
            PlaybackStatus::Error | PlaybackStatus::Idle => {
                if self.queue.current().is_some() {
                    self.begin_load(true).await;
                }
            }
            PlaybackStatus::Paused => match self.engine.play().await {
                Ok(()) => {
                    self.play_when_ready = true;
                    self.status = PlaybackStatus::Playing;
                }
                Err(err) => self.fail_current(err).await,
            },
            PlaybackStatus::Loading => self.play_when_ready = true,
            PlaybackStatus::Playing | PlaybackStatus::Buffering | PlaybackStatus::Completed => {}
        }
    }

    async fn pause(&mut self) {
        match self.status {
            PlaybackStatus::Playing | PlaybackStatus::Buffering => {
                self.play_when_ready = false;
                match self.engine.pause().await {
                    Ok(()) => self.status = PlaybackStatus::Paused,
                    Err(err) => self.fail_current(err).await,
                }
            }
            PlaybackStatus::Loading => self.play_when_ready = false,
            _ => {}
        }
    }

    async fn seek(&mut self, position: Duration) {
        if !matches!(
            self.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Buffering
        ) {
            debug!("ignoring seek without a loaded track");
            return;
        }
        let position = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        match self.engine.seek(position).await {
            Ok(()) => {
                self.set_position(position);
                self.position_moved = true;
            }
            Err(err) => warn!(error = %err, "seek failed"),
        }
    }

    async fn set_speed(&mut self, speed: f32) {
        if !speed.is_finite() || speed <= 0.0 {
            debug!(speed, "ignoring invalid speed");
            return;
        }
        match self.engine.set_speed(speed).await {
            Ok(()) => self.speed = speed,
            Err(err) => warn!(error = %err, "engine rejected speed"),
        }
    }

    async fn restart_current(&mut self) {
        if let Err(err) = self.engine.seek(Duration::ZERO).await {
            warn!(error = %err, "restart seek failed");
        }
        self.set_position(Duration::ZERO);
        self.position_moved = true;
        self.prefetch.on_track_changed();
    }

    // ===== Loading =====

    /// Load the current track; `autoplay` starts playback once loaded
    async fn begin_load(&mut self, autoplay: bool) {
        let Some(track) = self.queue.current().cloned() else {
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        self.status = PlaybackStatus::Loading;
        self.play_when_ready = autoplay;
        self.playback_data = None;
        self.error = None;
        self.duration = track.duration();
        self.buffered_position = Duration::ZERO;
        self.set_position(Duration::ZERO);
        self.prefetch.on_track_changed();
        self.radio.clear_pending_advance();

        if let Err(err) = self.engine.pause().await {
            debug!(error = %err, "engine pause before load failed");
        }

        info!(track_id = %track.id, generation, "loading track");
        let Some(inbox) = self.inbox.upgrade() else {
            return;
        };
        let resolver = self.resolver.clone();
        let quality = self.audio_quality;
        let min_local_bytes = self.config.min_local_file_bytes;
        tokio::spawn(async move {
            let outcome = load_source(resolver.as_ref(), &track, quality, min_local_bytes).await;
            let _ = inbox.send(Message::Resolved {
                generation,
                track_id: track.id,
                outcome,
            });
        });
    }

    async fn on_resolved(
        &mut self,
        generation: u64,
        track_id: TrackId,
        outcome: crate::error::Result<LoadedSource>,
    ) {
        if generation != self.generation {
            debug!(track_id = %track_id, generation, current = self.generation, "discarding superseded load");
            return;
        }

        let source = match outcome {
            Ok(source) => source,
            Err(err) => {
                warn!(track_id = %track_id, error = %err, "track could not be loaded");
                self.enter_error(err).await;
                return;
            }
        };

        if let Err(err) = self.engine.set_source(source.uri(), true).await {
            self.fail(track_id, err).await;
            return;
        }

        self.playback_data = source.into_playback_data();
        self.error = None;

        if self.play_when_ready {
            if let Err(err) = self.engine.play().await {
                self.fail(track_id, err).await;
                return;
            }
            self.status = PlaybackStatus::Playing;
        } else {
            self.status = PlaybackStatus::Paused;
        }
        info!(track_id = %track_id, status = ?self.status, "track loaded");

        if std::mem::take(&mut self.prefetch_queue_on_load) {
            self.prefetch.submit_queue(&self.queue, self.audio_quality);
        }
        self.check_radio_watermark();
    }

    /// Extend a radio queue that ran low while a track is loaded
    fn check_radio_watermark(&mut self) {
        if self.has_loaded_source() && self.radio.should_extend(&self.queue, false) {
            self.radio.request(&self.queue);
        }
    }

    /// Engine failure on `track_id`: drop its cached stream and stop
    async fn fail(&mut self, track_id: TrackId, source: EngineError) {
        error!(track_id = %track_id, error = %source, "engine failure");
        self.resolver.invalidate(&track_id);
        self.enter_error(PlayerError::EngineIo { track_id, source }).await;
    }

    async fn fail_current(&mut self, source: EngineError) {
        match self.queue.current().map(|track| track.id.clone()) {
            Some(track_id) => self.fail(track_id, source).await,
            None => warn!(error = %source, "engine failure without a current track"),
        }
    }

    async fn enter_error(&mut self, err: PlayerError) {
        self.generation += 1;
        self.play_when_ready = false;
        self.playback_data = None;
        if let Err(stop_err) = self.engine.stop().await {
            debug!(error = %stop_err, "engine stop failed");
        }
        self.status = PlaybackStatus::Error;
        self.error = Some(err);
    }

    /// Stop the engine and settle `Idle`, keeping the queue
    async fn halt(&mut self) {
        self.generation += 1;
        self.play_when_ready = false;
        self.playback_data = None;
        self.radio.clear_pending_advance();
        if let Err(err) = self.engine.stop().await {
            debug!(error = %err, "engine stop failed");
        }
        self.status = PlaybackStatus::Idle;
        self.buffered_position = Duration::ZERO;
        self.set_position(Duration::ZERO);
    }

    // ===== Engine events =====

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::PlayerState { playing, processing } => {
                self.on_player_state(playing, processing).await;
                self.publish();
            }
            EngineEvent::Position(position) => self.on_position(position),
            EngineEvent::BufferedPosition(position) => {
                if self.has_loaded_source() {
                    self.buffered_position = position;
                    self.publish_throttled();
                }
            }
            EngineEvent::Duration(duration) => {
                if self.has_loaded_source() && duration.is_some() {
                    self.duration = duration;
                    self.publish();
                }
            }
            EngineEvent::Error(err) => {
                if self.has_loaded_source() {
                    self.fail_current(err).await;
                    self.publish();
                } else {
                    debug!(error = %err, status = ?self.status, "ignoring engine error without a loaded source");
                }
            }
        }
    }

    fn has_loaded_source(&self) -> bool {
        matches!(
            self.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Buffering
        )
    }

    async fn on_player_state(&mut self, playing: bool, processing: ProcessingState) {
        match (self.status, processing) {
            (PlaybackStatus::Playing | PlaybackStatus::Buffering, ProcessingState::Completed) => {
                self.on_completed().await;
            }
            (PlaybackStatus::Playing, ProcessingState::Buffering | ProcessingState::Loading) => {
                self.status = PlaybackStatus::Buffering;
            }
            (PlaybackStatus::Buffering, ProcessingState::Ready) => {
                self.status = if playing {
                    PlaybackStatus::Playing
                } else {
                    PlaybackStatus::Paused
                };
            }
            (PlaybackStatus::Playing, ProcessingState::Ready) if !playing => {
                self.play_when_ready = false;
                self.status = PlaybackStatus::Paused;
            }
            (PlaybackStatus::Paused, ProcessingState::Ready) if playing => {
                self.play_when_ready = true;
                self.status = PlaybackStatus::Playing;
            }
            _ => {}
        }
    }

    fn on_position(&mut self, position: Duration) {
        if !self.has_loaded_source() {
            return;
        }
        self.set_position(position);
        self.check_prefetch_next();
        self.publish_throttled();
    }

    fn check_prefetch_next(&mut self) {
        let (Some(duration), Some(current)) = (self.duration, self.queue.current()) else {
            return;
        };
        let remaining = duration.saturating_sub(self.position);
        let next = match self.queue.loop_mode() {
            LoopMode::One => None,
            LoopMode::Off | LoopMode::All => self.queue.next_index().and_then(|index| self.queue.get(index)),
        };
        self.prefetch.on_progress(remaining, &current.id, next, self.audio_quality);
    }

    // ===== Completion =====

    async fn on_completed(&mut self) {
        self.status = PlaybackStatus::Completed;
        let Some(track_id) = self.queue.current().map(|track| track.id.clone()) else {
            self.halt().await;
            return;
        };
        debug!(track_id = %track_id, loop_mode = %self.queue.loop_mode(), "track completed");

        if self.queue.loop_mode() == LoopMode::One {
            self.restart_current().await;
            match self.engine.play().await {
                Ok(()) => self.status = PlaybackStatus::Playing,
                Err(err) => self.fail(track_id, err).await,
            }
            return;
        }

        if let Some(index) = self.queue.next_index() {
            self.skip_to(index).await;
        } else if self.radio.is_enabled() {
            self.await_radio_for_advance().await;
        } else {
            info!("end of queue");
            self.halt().await;
        }
    }

    /// End of queue in radio mode: wait for one fetch cycle
    async fn await_radio_for_advance(&mut self) {
        let in_flight = self.radio.is_fetching() || self.radio.request(&self.queue);
        if !in_flight {
            info!("end of queue, radio cannot extend");
            self.halt().await;
            return;
        }
        debug!("end of queue, waiting for radio");
        self.radio.set_pending_advance();
        self.status = PlaybackStatus::Loading;
        self.play_when_ready = true;
    }

    async fn on_radio_fetched(
        &mut self,
        token: u64,
        seed: TrackId,
        outcome: std::result::Result<Vec<Track>, FetchError>,
    ) {
        if !self.radio.complete(token) {
            return;
        }

        let appended = match outcome {
            Ok(fetched) => {
                let admitted = self.radio.admit(fetched, &self.queue);
                let appended = self.queue.append(admitted);
                if appended > 0 {
                    info!(seed = %seed, appended, len = self.queue.len(), "radio extended queue");
                }
                appended
            }
            Err(source) => {
                let err = PlayerError::RadioFetchFailed { seed, source };
                warn!(error = %err, "radio fetch failed");
                0
            }
        };

        if self.radio.take_pending_advance() {
            // A pause sent while waiting must survive the advance.
            let autoplay = self.play_when_ready;
            match self.queue.next_index().filter(|_| appended > 0) {
                Some(index) => match self.queue.set_current(index) {
                    Ok(()) => self.begin_load(autoplay).await,
                    Err(err) => {
                        debug!(error = %err, "radio advance target vanished");
                        self.halt().await;
                    }
                },
                None => {
                    info!("radio produced nothing new, stopping");
                    self.halt().await;
                }
            }
        }
    }

    // ===== Publishing =====

    fn set_position(&mut self, position: Duration) {
        self.position = position;
        self.position_tx.send_replace(position);
    }

    fn snapshot(&mut self) -> PlaybackState {
        let revision = self.queue.revision();
        if self.snapshot_revision != Some(revision) {
            self.queue_snapshot = Arc::new(self.queue.tracks().to_vec());
            self.snapshot_revision = Some(revision);
        }

        PlaybackState {
            status: self.status,
            current_track: self.queue.current().cloned(),
            queue: self.queue_snapshot.clone(),
            revision,
            current_index: self.queue.current_index(),
            source_id: self.queue.source_id().cloned(),
            is_playing: matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Buffering),
            is_buffering: self.status == PlaybackStatus::Buffering,
            is_loading: self.status == PlaybackStatus::Loading,
            position: self.position,
            buffered_position: self.buffered_position,
            duration: self.duration,
            speed: self.speed,
            loop_mode: self.queue.loop_mode(),
            shuffle: self.queue.is_shuffled(),
            error: self.error.clone(),
            audio_quality: self.audio_quality,
            playback_data: self.playback_data.clone(),
            radio_mode: self.radio.is_enabled(),
            radio_fetching: self.radio.is_fetching(),
        }
    }

    /// Publish if anything but the positions changed, or a command moved
    /// the position
    fn publish(&mut self) {
        let next = self.snapshot();
        if std::mem::take(&mut self.position_moved) {
            self.state_tx.send_replace(next);
            self.last_position_publish = Instant::now();
            return;
        }
        let published = self.state_tx.send_if_modified(move |current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if published {
            self.last_position_publish = Instant::now();
        }
    }

    /// Publish including positions, at most once per interval
    fn publish_throttled(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_position_publish) < self.config.position_publish_interval() {
            return;
        }
        self.last_position_publish = now;
        let next = self.snapshot();
        self.state_tx.send_replace(next);
    }

    async fn shutdown(&mut self) {
        info!("shutting down playback orchestrator");
        self.radio.disable();
        self.prefetch.cancel();
        self.halt().await;
        self.publish();
    }
}

/// Next engine event, or `None` once the stream is closed
///
/// After the stream closes every later call stays pending forever.
async fn next_engine_event(events: &mut Option<broadcast::Receiver<EngineEvent>>) -> Option<EngineEvent> {
    let Some(receiver) = events.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "engine events lagged"),
            Err(RecvError::Closed) => {
                warn!("engine event stream closed");
                *events = None;
                return None;
            }
        }
    }
}
