//! Shared fakes for player integration tests

use async_trait::async_trait;
use drift_core::{
    AudioEngine, AudioQuality, EngineError, EngineEvent, FetchError, LoopMode, PlaybackData,
    RelatedTracksProvider, ResolveError, StreamFormat, StreamResolver, Track, TrackId,
};
use drift_playback::{PlaybackState, Player, PlayerConfig, PlayerHandle};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

const WAIT: Duration = Duration::from_secs(3);

// ===== Helpers =====

pub fn track(id: &str) -> Track {
    Track::new(id, format!("Title {id}"), "Artist", Duration::from_secs(200))
}

pub fn tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn stream_url(id: &str) -> String {
    format!("https://cdn.test/{id}.opus")
}

pub fn queue_ids(state: &PlaybackState) -> Vec<String> {
    state.queue.iter().map(|t| t.id.as_str().to_string()).collect()
}

/// Wait until the published state satisfies `predicate`
pub async fn wait_for_state(
    player: &PlayerHandle,
    mut predicate: impl FnMut(&PlaybackState) -> bool,
) -> PlaybackState {
    let mut states = player.subscribe();
    let result = tokio::time::timeout(WAIT, states.wait_for(|state| predicate(state))).await;
    let state = result
        .expect("timed out waiting for player state")
        .expect("player stopped publishing");
    PlaybackState::clone(&state)
}

/// Wait until the raw position channel reports `position`
pub async fn wait_for_position(player: &PlayerHandle, position: Duration) {
    let mut positions = player.subscribe_position();
    tokio::time::timeout(WAIT, positions.wait_for(|p| *p == position))
        .await
        .expect("timed out waiting for position")
        .expect("player stopped publishing");
}

/// Poll `condition` until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

pub struct Harness {
    pub player: PlayerHandle,
    pub resolver: Arc<FakeResolver>,
    pub engine: Arc<FakeEngine>,
    pub related: Arc<ScriptedRelated>,
}

impl Harness {
    pub fn start() -> Self {
        Self::start_with(PlayerConfig::default())
    }

    pub fn start_with(config: PlayerConfig) -> Self {
        let resolver = Arc::new(FakeResolver::default());
        let engine = Arc::new(FakeEngine::new());
        let related = Arc::new(ScriptedRelated::default());
        let player = Player::new(config, resolver.clone(), engine.clone(), related.clone()).start();
        Self {
            player,
            resolver,
            engine,
            related,
        }
    }

    /// Play `ids` from `start` and wait until the start track is playing
    pub async fn play_ids(&self, ids: &[&str], start: usize) -> PlaybackState {
        self.player
            .play_queue(tracks(ids), start, None)
            .await
            .expect("play_queue");
        let expected = ids[start].to_string();
        wait_for_state(&self.player, |s| {
            s.status == drift_playback::PlaybackStatus::Playing
                && s.current_track.as_ref().map(|t| t.id.as_str()) == Some(expected.as_str())
        })
        .await
    }
}

// ===== Resolver =====

#[derive(Default)]
pub struct FakeResolver {
    cache: Mutex<HashSet<TrackId>>,
    failing: Mutex<HashSet<TrackId>>,
    gates: Mutex<HashMap<TrackId, Arc<Notify>>>,
    resolved: Mutex<Vec<TrackId>>,
    prefetched: Mutex<Vec<Vec<TrackId>>>,
    prefetched_next: Mutex<Vec<TrackId>>,
    invalidated: Mutex<Vec<TrackId>>,
    invalidate_all_calls: Mutex<usize>,
}

impl FakeResolver {
    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(TrackId::new(id));
    }

    pub fn recover(&self, id: &str) {
        self.failing.lock().unwrap().remove(&TrackId::new(id));
    }

    /// Hold resolution of `id` until the returned notify fires
    pub fn gate(&self, id: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(TrackId::new(id), notify.clone());
        notify
    }

    pub fn mark_cached(&self, id: &str) {
        self.cache.lock().unwrap().insert(TrackId::new(id));
    }

    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().iter().map(|id| id.to_string()).collect()
    }

    pub fn prefetched(&self) -> Vec<Vec<String>> {
        self.prefetched
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.iter().map(|id| id.to_string()).collect())
            .collect()
    }

    pub fn prefetched_next(&self) -> Vec<String> {
        self.prefetched_next.lock().unwrap().iter().map(|id| id.to_string()).collect()
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.lock().unwrap().iter().map(|id| id.to_string()).collect()
    }

    pub fn invalidate_all_calls(&self) -> usize {
        *self.invalidate_all_calls.lock().unwrap()
    }
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve(&self, id: &TrackId, quality: AudioQuality) -> Result<PlaybackData, ResolveError> {
        let gate = self.gates.lock().unwrap().remove(id);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.resolved.lock().unwrap().push(id.clone());

        if self.failing.lock().unwrap().contains(id) {
            return Err(ResolveError::exhausted("fake failure"));
        }
        self.cache.lock().unwrap().insert(id.clone());
        Ok(PlaybackData::new(
            stream_url(id.as_str()),
            StreamFormat::new("audio/ogg", quality.nominal_bitrate()).with_codec("opus"),
            3600,
        ))
    }

    async fn prefetch(&self, ids: &[TrackId], _quality: AudioQuality) {
        self.prefetched.lock().unwrap().push(ids.to_vec());
    }

    async fn prefetch_next(&self, id: &TrackId, _quality: AudioQuality) {
        self.prefetched_next.lock().unwrap().push(id.clone());
    }

    fn has_cached(&self, id: &TrackId) -> bool {
        self.cache.lock().unwrap().contains(id)
    }

    fn invalidate(&self, id: &TrackId) {
        self.cache.lock().unwrap().remove(id);
        self.invalidated.lock().unwrap().push(id.clone());
    }

    fn invalidate_all(&self) {
        self.cache.lock().unwrap().clear();
        *self.invalidate_all_calls.lock().unwrap() += 1;
    }
}

// ===== Engine =====

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    SetSource(String),
    Play,
    Pause,
    Stop,
    Seek(Duration),
    SetSpeed(f32),
    SetLoopMode(LoopMode),
}

pub struct FakeEngine {
    events: broadcast::Sender<EngineEvent>,
    calls: Mutex<Vec<EngineCall>>,
    reject_sources: Mutex<bool>,
}

impl FakeEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            calls: Mutex::new(Vec::new()),
            reject_sources: Mutex::new(false),
        }
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub fn reject_sources(&self, reject: bool) {
        *self.reject_sources.lock().unwrap() = reject;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sources(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::SetSource(uri) => Some(uri),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn set_source(&self, uri: &str, _preload: bool) -> Result<(), EngineError> {
        self.record(EngineCall::SetSource(uri.to_string()));
        if *self.reject_sources.lock().unwrap() {
            return Err(EngineError::source("unsupported stream"));
        }
        Ok(())
    }

    async fn play(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Play);
        Ok(())
    }

    async fn pause(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Pause);
        Ok(())
    }

    async fn stop(&self) -> Result<(), EngineError> {
        self.record(EngineCall::Stop);
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<(), EngineError> {
        self.record(EngineCall::Seek(position));
        Ok(())
    }

    async fn set_speed(&self, speed: f32) -> Result<(), EngineError> {
        self.record(EngineCall::SetSpeed(speed));
        Ok(())
    }

    async fn set_loop_mode(&self, mode: LoopMode) -> Result<(), EngineError> {
        self.record(EngineCall::SetLoopMode(mode));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

// ===== Related tracks =====

/// Provider answering from a script; once the script runs out it answers
/// with the fallback batch
#[derive(Default)]
pub struct ScriptedRelated {
    script: Mutex<VecDeque<Result<Vec<Track>, FetchError>>>,
    fallback: Mutex<Vec<Track>>,
    gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<TrackId>>,
}

impl ScriptedRelated {
    pub fn push(&self, response: Result<Vec<Track>, FetchError>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn always(&self, batch: Vec<Track>) {
        *self.fallback.lock().unwrap() = batch;
    }

    /// Hold the next fetch until the returned notify fires
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|id| id.to_string()).collect()
    }
}

#[async_trait]
impl RelatedTracksProvider for ScriptedRelated {
    async fn fetch_related(&self, seed: &TrackId, _limit: usize) -> Result<Vec<Track>, FetchError> {
        self.calls.lock().unwrap().push(seed.clone());
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(response) => response,
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }
}
