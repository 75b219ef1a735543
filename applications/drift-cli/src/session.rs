//! Following a running player from the terminal

use anyhow::{Context, Result};
use drift_core::{Track, TrackId};
use drift_playback::{PlaybackState, PlaybackStatus, PlayerHandle};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// How state changes are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// One line per track change or notable status change
    Text,
    /// Every published snapshot as a JSON line
    Json,
    Quiet,
}

/// What happened during a session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionReport {
    /// Tracks in the order they started playing
    pub started: Vec<TrackId>,

    /// Largest queue length seen
    pub peak_queue_len: usize,

    /// Load failures that were skipped over
    pub failures: usize,

    pub final_status: PlaybackStatus,
}

/// Follow `player` until `max_tracks` tracks have played or the queue runs out
///
/// A failed load is skipped when a next track exists; otherwise the session
/// ends in the error state.
pub async fn follow(player: &PlayerHandle, max_tracks: usize, output: Output) -> Result<SessionReport> {
    let mut states = player.subscribe();
    let mut report = SessionReport::default();
    let mut last_error = None;
    let mut last_status = None;

    loop {
        let state = PlaybackState::clone(&states.borrow_and_update());
        report.peak_queue_len = report.peak_queue_len.max(state.queue.len());
        report.final_status = state.status;

        if output == Output::Json {
            println!("{}", serde_json::to_string(&state).context("failed to encode state")?);
        }

        let current = state.current_track.as_ref();
        let is_new = current.is_some_and(|track| report.started.last() != Some(&track.id));
        if is_new && report.started.len() >= max_tracks {
            info!(played = report.started.len(), "track limit reached");
            break;
        }
        let audible = matches!(state.status, PlaybackStatus::Playing | PlaybackStatus::Paused);
        if let Some(track) = current.filter(|_| is_new && audible) {
            report.started.push(track.id.clone());
            if output == Output::Text {
                println!("{:>3}. {}", report.started.len(), describe(track));
            }
        }

        if last_status != Some(state.status) && output == Output::Text {
            match state.status {
                PlaybackStatus::Buffering => println!("     buffering..."),
                PlaybackStatus::Paused => println!("     paused"),
                _ => {}
            }
        }
        last_status = Some(state.status);

        match state.status {
            PlaybackStatus::Error => {
                let message = state.error.as_ref().map(ToString::to_string);
                if message != last_error {
                    report.failures += 1;
                    warn!(error = ?message, "playback failed");
                    last_error = message;
                    if !state.has_next() {
                        break;
                    }
                    player.skip_to_next().await?;
                }
            }
            PlaybackStatus::Idle if !report.started.is_empty() => break,
            _ => last_error = None,
        }

        if states.changed().await.is_err() {
            break;
        }
    }

    Ok(report)
}

fn describe(track: &Track) -> String {
    let length = track.duration().map(format_duration).unwrap_or_else(|| "-:--".to_string());
    format!("{}  {} - {} [{}]", track.id, track.title, track.artist, length)
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
