//! Clock-driven virtual audio engine
//!
//! Plays nothing. A tokio interval advances the position of the loaded
//! source at `time_scale` virtual seconds per second and reports progress
//! and completion on the event stream. Calls made by the player are not
//! echoed back as state events; only transitions the engine makes on its own
//! (progress, end of track) are reported.

use super::{track_id_from_uri, Catalog};
use async_trait::async_trait;
use drift_core::{AudioEngine, EngineError, EngineEvent, LoopMode, TrackId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

const EVENT_CAPACITY: usize = 256;
const BUFFER_AHEAD: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct Transport {
    source: Option<TrackId>,
    duration: Duration,
    position: Duration,
    playing: bool,
    speed: f32,
    loop_mode: LoopMode,
}

impl Transport {
    /// Move the clock forward by `elapsed` virtual time
    fn advance(&mut self, elapsed: Duration) -> Vec<EngineEvent> {
        if !self.playing || self.source.is_none() {
            return Vec::new();
        }

        self.position += elapsed.mul_f32(self.speed);
        if self.position < self.duration {
            let buffered = (self.position + BUFFER_AHEAD).min(self.duration);
            return vec![
                EngineEvent::Position(self.position),
                EngineEvent::BufferedPosition(buffered),
            ];
        }

        if self.loop_mode == LoopMode::One {
            self.position = Duration::ZERO;
            return vec![EngineEvent::Position(Duration::ZERO)];
        }

        self.position = self.duration;
        self.playing = false;
        vec![
            EngineEvent::Position(self.duration),
            EngineEvent::completed(),
        ]
    }
}

/// Audio engine simulated on a virtual clock
pub struct VirtualEngine {
    catalog: Arc<Catalog>,
    transport: Arc<Mutex<Transport>>,
    events: broadcast::Sender<EngineEvent>,
    clock: JoinHandle<()>,
}

impl VirtualEngine {
    /// Start the engine clock on the current runtime
    pub fn spawn(catalog: Arc<Catalog>, tick: Duration, time_scale: f64) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let transport = Arc::new(Mutex::new(Transport {
            speed: 1.0,
            ..Transport::default()
        }));

        let step = tick.mul_f64(time_scale);
        let clock = tokio::spawn(run_clock(transport.clone(), events.clone(), tick, step));

        Arc::new(Self {
            catalog,
            transport,
            events,
            clock,
        })
    }

    /// Current virtual position
    pub fn position(&self) -> Duration {
        self.transport().position
    }

    pub fn is_playing(&self) -> bool {
        self.transport().playing
    }

    fn transport(&self) -> MutexGuard<'_, Transport> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

async fn run_clock(
    transport: Arc<Mutex<Transport>>,
    events: broadcast::Sender<EngineEvent>,
    tick: Duration,
    step: Duration,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let emitted = transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(step);
        for event in emitted {
            trace!(?event, "engine event");
            let _ = events.send(event);
        }
    }
}

impl Drop for VirtualEngine {
    fn drop(&mut self) {
        self.clock.abort();
    }
}

#[async_trait]
impl AudioEngine for VirtualEngine {
    async fn set_source(&self, uri: &str, _preload: bool) -> Result<(), EngineError> {
        let id = track_id_from_uri(uri)
            .ok_or_else(|| EngineError::source(format!("unsupported uri: {uri}")))?;
        let duration = self
            .catalog
            .duration_of(&id)
            .ok_or_else(|| EngineError::io(format!("no audio behind {uri}")))?;

        {
            let mut transport = self.transport();
            transport.source = Some(id.clone());
            transport.duration = duration;
            transport.position = Duration::ZERO;
            transport.playing = false;
        }
        debug!(track_id = %id, ?duration, "source loaded");
        self.emit(EngineEvent::Duration(Some(duration)));
        Ok(())
    }

    async fn play(&self) -> Result<(), EngineError> {
        let mut transport = self.transport();
        if transport.source.is_none() {
            return Err(EngineError::InvalidState("no source loaded".to_string()));
        }
        transport.playing = true;
        Ok(())
    }

    async fn pause(&self) -> Result<(), EngineError> {
        self.transport().playing = false;
        Ok(())
    }

    async fn stop(&self) -> Result<(), EngineError> {
        let mut transport = self.transport();
        transport.playing = false;
        transport.source = None;
        transport.position = Duration::ZERO;
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<(), EngineError> {
        let position = {
            let mut transport = self.transport();
            if transport.source.is_none() {
                return Err(EngineError::InvalidState("no source loaded".to_string()));
            }
            transport.position = position.min(transport.duration);
            transport.position
        };
        self.emit(EngineEvent::Position(position));
        Ok(())
    }

    async fn set_speed(&self, speed: f32) -> Result<(), EngineError> {
        self.transport().speed = speed;
        Ok(())
    }

    async fn set_loop_mode(&self, mode: LoopMode) -> Result<(), EngineError> {
        self.transport().loop_mode = mode;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
