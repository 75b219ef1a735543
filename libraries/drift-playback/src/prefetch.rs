//! Prefetch pipeline
//!
//! Best-effort background resolution of upcoming tracks:
//! - after a queue is played, every other track in the queue, nearest first
//! - near the end of the current track, the single track that plays next
//!
//! Failures stay inside the resolver; nothing here reports back except the
//! completion of a queue batch.

use crate::command::Message;
use crate::queue::Queue;
use crate::supervisor::TaskSlot;
use drift_core::{AudioQuality, StreamResolver, Track, TrackId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tracing::debug;

/// Track ids ordered by distance from `current`, excluding `current`
///
/// Ties go to the later track: `current+1, current-1, current+2, ...`.
pub fn prioritized_ids(tracks: &[Track], current: usize) -> Vec<TrackId> {
    let mut ids = Vec::with_capacity(tracks.len().saturating_sub(1));
    for distance in 1..tracks.len() {
        if let Some(track) = tracks.get(current + distance) {
            ids.push(track.id.clone());
        }
        if let Some(track) = current.checked_sub(distance).and_then(|index| tracks.get(index)) {
            ids.push(track.id.clone());
        }
    }
    ids
}

pub(crate) struct PrefetchPipeline {
    resolver: Arc<dyn StreamResolver>,
    inbox: WeakUnboundedSender<Message>,
    threshold: Duration,
    batch: TaskSlot,
    /// Track whose successor has already been submitted
    next_latch: Option<TrackId>,
}

impl PrefetchPipeline {
    pub(crate) fn new(
        resolver: Arc<dyn StreamResolver>,
        inbox: WeakUnboundedSender<Message>,
        threshold: Duration,
    ) -> Self {
        Self {
            resolver,
            inbox,
            threshold,
            batch: TaskSlot::new("prefetch"),
            next_latch: None,
        }
    }

    /// Submit the whole queue, replacing any batch in flight
    pub(crate) fn submit_queue(&mut self, queue: &Queue, quality: AudioQuality) {
        let Some(current) = queue.current_index() else {
            return;
        };
        let ids: Vec<TrackId> = prioritized_ids(queue.tracks(), current)
            .into_iter()
            .filter(|id| !self.resolver.has_cached(id))
            .collect();
        if ids.is_empty() {
            debug!("every queued track already cached");
            return;
        }

        let count = ids.len();
        let resolver = self.resolver.clone();
        let inbox = self.inbox.clone();
        let token = self.batch.replace(move |token| async move {
            resolver.prefetch(&ids, quality).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(Message::PrefetchFinished { token });
            }
        });
        debug!(count, token, "submitted queue for prefetch");
    }

    /// Reset the next-track latch after a track change or replay
    pub(crate) fn on_track_changed(&mut self) {
        self.next_latch = None;
    }

    /// Submit the next track once `remaining` drops to the threshold
    ///
    /// Returns whether a submission happened.
    pub(crate) fn on_progress(
        &mut self,
        remaining: Duration,
        current: &TrackId,
        next: Option<&Track>,
        quality: AudioQuality,
    ) -> bool {
        if remaining > self.threshold {
            return false;
        }
        let Some(next) = next else {
            return false;
        };
        if self.next_latch.as_ref() == Some(current) {
            return false;
        }
        self.next_latch = Some(current.clone());

        if &next.id == current || self.resolver.has_cached(&next.id) {
            return false;
        }

        let resolver = self.resolver.clone();
        let id = next.id.clone();
        debug!(track_id = %id, remaining_ms = remaining.as_millis() as u64, "prefetching next track");
        tokio::spawn(async move {
            resolver.prefetch_next(&id, quality).await;
        });
        true
    }

    /// Accept a batch completion
    pub(crate) fn finish(&mut self, token: u64) {
        if self.batch.finish(token) {
            debug!(token, "queue prefetch finished");
        }
    }

    /// Abort the batch in flight
    pub(crate) fn cancel(&mut self) {
        self.batch.cancel();
        self.next_latch = None;
    }
}
