//! Queue model
//!
//! An ordered sequence of tracks plus a cursor. Owns shuffle and loop
//! semantics; performs no I/O.
//!
//! ```text
//! tracks:          [C] [A] [D] [B]      <- play order (shuffled)
//!                   ^ current_index = 0
//! original_order:  [A] [B] [C] [D]      <- order as supplied
//! ```
//!
//! Every call that changes membership or ordering bumps `revision` exactly
//! once. Cursor moves and mode flags leave it untouched.

use crate::error::{PlayerError, Result};
use crate::shuffle::shuffle_keeping_current;
use drift_core::{CollectionId, LoopMode, Track, TrackId};
use rand::Rng;

/// Outcome of removing a track
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    /// The removed track
    pub track: Track,

    /// Whether the removed track was the current one
    pub was_current: bool,

    /// Whether a following track slid into the removed current slot
    pub has_successor: bool,
}

/// Ordered playback queue with cursor
#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Play order
    tracks: Vec<Track>,

    /// Order as supplied, used to undo shuffle
    original_order: Vec<Track>,

    /// Cursor; `Some` iff `tracks` is non-empty
    current_index: Option<usize>,

    /// Structural change counter
    revision: u64,

    /// Collection the queue was produced from
    source_id: Option<CollectionId>,

    /// Shuffle mode flag
    shuffled: bool,

    /// Loop mode flag
    loop_mode: LoopMode,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue with initial mode flags
    pub fn with_modes(loop_mode: LoopMode, shuffled: bool) -> Self {
        Self {
            loop_mode,
            shuffled,
            ..Self::default()
        }
    }

    // ===== Accessors =====

    /// Tracks in play order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Tracks in the order they were supplied
    pub fn original_order(&self) -> &[Track] {
        &self.original_order
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current(&self) -> Option<&Track> {
        self.current_index.and_then(|index| self.tracks.get(index))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn source_id(&self) -> Option<&CollectionId> {
        self.source_id.as_ref()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    /// Whether a track with `id` is in the queue
    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.iter().any(|track| &track.id == id)
    }

    /// Number of tracks after the current one
    pub fn remaining_after_current(&self) -> usize {
        match self.current_index {
            Some(index) => self.tracks.len().saturating_sub(index + 1),
            None => 0,
        }
    }

    // ===== Navigation =====

    /// Index that follows the current one, honouring loop-all wrap-around
    pub fn next_index(&self) -> Option<usize> {
        let index = self.current_index?;
        if index + 1 < self.tracks.len() {
            Some(index + 1)
        } else if self.loop_mode == LoopMode::All {
            Some(0)
        } else {
            None
        }
    }

    /// Index that precedes the current one, honouring loop-all wrap-around
    pub fn previous_index(&self) -> Option<usize> {
        let index = self.current_index?;
        if index > 0 {
            Some(index - 1)
        } else if self.loop_mode == LoopMode::All {
            Some(self.tracks.len() - 1)
        } else {
            None
        }
    }

    /// Move the cursor
    pub fn set_current(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.current_index = Some(index);
        Ok(())
    }

    // ===== Mode flags =====

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    /// Toggle shuffle using the thread-local RNG
    ///
    /// Returns the new shuffle flag.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.toggle_shuffle_with(&mut rand::thread_rng())
    }

    /// Toggle shuffle with an explicit RNG
    ///
    /// Enabling shuffles every track except the current one and moves the
    /// current track to index 0. Disabling restores the supplied order and
    /// points the cursor at the current track's position there (or 0).
    pub fn toggle_shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.shuffled {
            self.unshuffle();
        } else {
            self.shuffle(rng);
        }
        self.shuffled
    }

    fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.shuffled = true;
        if self.tracks.is_empty() {
            return;
        }
        self.tracks = shuffle_keeping_current(&self.tracks, self.current_index, rng);
        self.current_index = Some(0);
        self.bump();
    }

    fn unshuffle(&mut self) {
        self.shuffled = false;
        if self.tracks.is_empty() {
            return;
        }
        let current_id = self.current().map(|track| track.id.clone());
        self.tracks.clone_from(&self.original_order);
        self.current_index = current_id
            .and_then(|id| self.tracks.iter().position(|track| track.id == id))
            .or(Some(0));
        self.bump();
    }

    // ===== Structural mutations =====

    /// Replace the whole queue
    ///
    /// `start_index` out of range falls back to 0. When shuffle is on the new
    /// queue is shuffled with the start track first.
    pub fn replace(&mut self, tracks: Vec<Track>, start_index: usize, source_id: Option<CollectionId>) {
        let changed = !(tracks.is_empty() && self.tracks.is_empty());
        self.source_id = source_id;
        self.original_order.clone_from(&tracks);
        self.current_index = if tracks.is_empty() {
            None
        } else if start_index < tracks.len() {
            Some(start_index)
        } else {
            Some(0)
        };
        self.tracks = tracks;

        if self.shuffled && !self.tracks.is_empty() {
            self.tracks = shuffle_keeping_current(&self.tracks, self.current_index, &mut rand::thread_rng());
            self.current_index = Some(0);
        }
        if changed {
            self.bump();
        }
    }

    /// Append tracks at the end
    ///
    /// Returns the number of tracks appended. Appending to an empty queue
    /// points the cursor at the first new track.
    pub fn append(&mut self, tracks: Vec<Track>) -> usize {
        if tracks.is_empty() {
            return 0;
        }
        let count = tracks.len();
        self.original_order.extend(tracks.iter().cloned());
        self.tracks.extend(tracks);
        if self.current_index.is_none() {
            self.current_index = Some(0);
        }
        self.bump();
        count
    }

    /// Insert a track right after the current one
    pub fn insert_next(&mut self, track: Track) {
        let Some(current) = self.current_index else {
            self.append(vec![track]);
            return;
        };

        if self.shuffled {
            let anchor = self.tracks[current].id.clone();
            match self.original_order.iter().position(|t| t.id == anchor) {
                Some(pos) => self.original_order.insert(pos + 1, track.clone()),
                None => self.original_order.push(track.clone()),
            }
        } else {
            self.original_order.insert(current + 1, track.clone());
        }
        self.tracks.insert(current + 1, track);
        self.bump();
    }

    /// Remove the track at `index`, keeping the cursor consistent
    pub fn remove_at(&mut self, index: usize) -> Result<Removal> {
        self.check_index(index)?;
        let Some(current) = self.current_index else {
            return Err(PlayerError::QueueOperationOnEmptyQueue);
        };

        let track = self.tracks.remove(index);
        if self.shuffled {
            if let Some(pos) = self.original_order.iter().position(|t| t.id == track.id) {
                self.original_order.remove(pos);
            }
        } else {
            self.original_order.remove(index);
        }
        self.bump();

        let was_current = index == current;
        let mut has_successor = false;
        if self.tracks.is_empty() {
            self.current_index = None;
        } else if index < current {
            self.current_index = Some(current - 1);
        } else if was_current {
            has_successor = index < self.tracks.len();
            self.current_index = Some(index.min(self.tracks.len() - 1));
        }

        Ok(Removal {
            track,
            was_current,
            has_successor,
        })
    }

    /// Move the track at `from` to `to`
    ///
    /// The cursor follows the current track.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        if !self.shuffled {
            let track = self.original_order.remove(from);
            self.original_order.insert(to, track);
        }

        if let Some(current) = self.current_index {
            self.current_index = Some(if current == from {
                to
            } else if from < current && current <= to {
                current - 1
            } else if to <= current && current < from {
                current + 1
            } else {
                current
            });
        }
        self.bump();
        Ok(())
    }

    /// Remove every track
    pub fn clear(&mut self) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(PlayerError::QueueOperationOnEmptyQueue);
        }
        self.tracks.clear();
        self.original_order.clear();
        self.current_index = None;
        self.source_id = None;
        self.bump();
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if self.tracks.is_empty() {
            Err(PlayerError::QueueOperationOnEmptyQueue)
        } else if index >= self.tracks.len() {
            Err(PlayerError::OutOfRangeIndex {
                index,
                len: self.tracks.len(),
            })
        } else {
            Ok(())
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
