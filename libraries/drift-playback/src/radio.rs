//! Radio extension
//!
//! Keeps an open-ended queue topped up with related tracks. At most one fetch
//! is in flight; triggers that arrive meanwhile are dropped. Fetched tracks
//! are deduplicated against everything the session has already offered and
//! against the live queue before they reach the orchestrator.

use crate::command::Message;
use crate::config::RadioConfig;
use crate::queue::Queue;
use crate::supervisor::TaskSlot;
use drift_core::{RelatedTracksProvider, Track, TrackId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::WeakUnboundedSender;
use tracing::{debug, info, warn};

pub(crate) struct RadioExtension {
    provider: Arc<dyn RelatedTracksProvider>,
    inbox: WeakUnboundedSender<Message>,
    config: RadioConfig,
    fetch: TaskSlot,
    enabled: bool,
    /// Every id offered during the session
    seen: HashSet<TrackId>,
    seed: Option<TrackId>,
    rotation: usize,
    /// Playback reached the end of the queue and waits for this fetch
    pending_advance: bool,
    bound_reported: bool,
}

impl RadioExtension {
    pub(crate) fn new(
        provider: Arc<dyn RelatedTracksProvider>,
        inbox: WeakUnboundedSender<Message>,
        config: RadioConfig,
    ) -> Self {
        Self {
            provider,
            inbox,
            config,
            fetch: TaskSlot::new("radio"),
            enabled: false,
            seen: HashSet::new(),
            seed: None,
            rotation: 0,
            pending_advance: false,
            bound_reported: false,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn is_fetching(&self) -> bool {
        self.fetch.is_busy()
    }

    pub(crate) fn seed(&self) -> Option<&TrackId> {
        self.seed.as_ref()
    }

    /// Start a new session seeded by `seed`
    pub(crate) fn start_session(&mut self, seed: &Track) {
        self.reset();
        self.enabled = true;
        self.seen.insert(seed.id.clone());
        self.seed = Some(seed.id.clone());
        info!(seed = %seed.id, "radio session started");
    }

    /// Keep the session and remember additional tracks
    pub(crate) fn extend_seen<'a>(&mut self, tracks: impl IntoIterator<Item = &'a Track>) {
        if self.enabled {
            self.seen.extend(tracks.into_iter().map(|track| track.id.clone()));
        }
    }

    /// Turn radio off and forget the session
    pub(crate) fn disable(&mut self) {
        if self.enabled {
            info!("radio session ended");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.fetch.cancel();
        self.enabled = false;
        self.seen.clear();
        self.seed = None;
        self.rotation = 0;
        self.pending_advance = false;
        self.bound_reported = false;
    }

    /// Whether the queue is running low enough to extend
    ///
    /// `fresh_session` marks the first check right after a session starts.
    pub(crate) fn should_extend(&mut self, queue: &Queue, fresh_session: bool) -> bool {
        if !self.enabled || self.fetch.is_busy() {
            return false;
        }
        if queue.len() >= self.config.max_queue_len {
            if !self.bound_reported {
                warn!(len = queue.len(), bound = self.config.max_queue_len, "radio queue bound reached");
                self.bound_reported = true;
            }
            return false;
        }
        queue.remaining_after_current() <= self.config.low_watermark
            || (fresh_session && queue.len() <= self.config.fresh_session_max)
    }

    /// Start a fetch unless one is in flight
    ///
    /// Returns whether a fetch is now in flight because of this call.
    pub(crate) fn request(&mut self, queue: &Queue) -> bool {
        if !self.enabled || queue.len() >= self.config.max_queue_len {
            return false;
        }
        let Some(seed) = self.seed.clone().or_else(|| queue.current().map(|t| t.id.clone())) else {
            return false;
        };

        let provider = self.provider.clone();
        let inbox = self.inbox.clone();
        let limit = self.config.batch_size;
        let seed_for_task = seed.clone();
        let token = self.fetch.try_start(move |token| async move {
            let outcome = provider.fetch_related(&seed_for_task, limit).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(Message::RadioFetched {
                    token,
                    seed: seed_for_task,
                    outcome,
                });
            }
        });

        match token {
            Some(token) => {
                debug!(seed = %seed, token, limit, "radio fetch started");
                true
            }
            None => false,
        }
    }

    /// Accept the completion of the fetch holding `token`
    pub(crate) fn complete(&mut self, token: u64) -> bool {
        self.fetch.finish(token)
    }

    /// Filter a fetched batch down to tracks that may be appended
    ///
    /// Admitted ids join the seen set and the last admitted track becomes the
    /// next seed. When nothing survives, the seed rotates through the later
    /// half of the queue.
    pub(crate) fn admit(&mut self, fetched: Vec<Track>, queue: &Queue) -> Vec<Track> {
        let room = self.config.max_queue_len.saturating_sub(queue.len());
        let fetched_count = fetched.len();
        let mut admitted = Vec::new();

        for track in fetched {
            if admitted.len() >= room {
                break;
            }
            if self.seen.contains(&track.id) || queue.contains(&track.id) {
                continue;
            }
            self.seen.insert(track.id.clone());
            admitted.push(track);
        }

        match admitted.last() {
            Some(last) => self.seed = Some(last.id.clone()),
            None => {
                self.rotate_seed(queue);
                debug!(fetched = fetched_count, seed = ?self.seed, "radio batch fully deduplicated, rotated seed");
            }
        }
        admitted
    }

    /// Choose the next seed from the later half of the queue
    fn rotate_seed(&mut self, queue: &Queue) {
        let tracks = queue.tracks();
        let candidates: Vec<&TrackId> = tracks[tracks.len() / 2..]
            .iter()
            .map(|track| &track.id)
            .filter(|id| Some(*id) != self.seed.as_ref())
            .collect();
        if candidates.is_empty() {
            return;
        }
        let pick = candidates[self.rotation % candidates.len()].clone();
        self.rotation += 1;
        self.seed = Some(pick);
    }

    pub(crate) fn set_pending_advance(&mut self) {
        self.pending_advance = true;
    }

    pub(crate) fn clear_pending_advance(&mut self) {
        self.pending_advance = false;
    }

    pub(crate) fn take_pending_advance(&mut self) -> bool {
        std::mem::take(&mut self.pending_advance)
    }

    pub(crate) fn cancel(&mut self) {
        self.fetch.cancel();
        self.pending_advance = false;
    }
}
