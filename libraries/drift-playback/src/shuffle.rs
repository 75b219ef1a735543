//! Shuffle algorithm for queue randomization
//!
//! Fisher-Yates over every track except the current one, which is moved to the
//! front so playback continues uninterrupted.

use drift_core::Track;
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle `tracks` uniformly, placing the track at `current` first
///
/// Returns the shuffled sequence. The current track (if any) is always at
/// index 0 of the result; every other track is uniformly permuted behind it.
pub fn shuffle_keeping_current<R: Rng + ?Sized>(
    tracks: &[Track],
    current: Option<usize>,
    rng: &mut R,
) -> Vec<Track> {
    let mut rest: Vec<Track> = tracks
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != current)
        .map(|(_, track)| track.clone())
        .collect();
    rest.shuffle(rng);

    let mut shuffled = Vec::with_capacity(tracks.len());
    if let Some(track) = current.and_then(|index| tracks.get(index)) {
        shuffled.push(track.clone());
    }
    shuffled.extend(rest);
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::time::Duration;

    fn create_test_tracks(count: usize) -> Vec<Track> {
        (0..count)
            .map(|i| Track::new(format!("t{i}"), format!("Track {i}"), "Artist", Duration::from_secs(180)))
            .collect()
    }

    #[test]
    fn current_track_moves_to_front() {
        let tracks = create_test_tracks(10);
        let mut rng = StdRng::seed_from_u64(7);

        let shuffled = shuffle_keeping_current(&tracks, Some(4), &mut rng);

        assert_eq!(shuffled.len(), 10);
        assert_eq!(shuffled[0].id.as_str(), "t4");
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let tracks = create_test_tracks(25);
        let mut rng = StdRng::seed_from_u64(42);

        let shuffled = shuffle_keeping_current(&tracks, Some(0), &mut rng);

        let original: HashSet<_> = tracks.iter().map(|t| t.id.clone()).collect();
        let after: HashSet<_> = shuffled.iter().map(|t| t.id.clone()).collect();
        assert_eq!(original, after);
    }

    #[test]
    fn without_current_everything_is_shuffled() {
        let tracks = create_test_tracks(3);
        let mut rng = StdRng::seed_from_u64(1);

        let shuffled = shuffle_keeping_current(&tracks, None, &mut rng);
        assert_eq!(shuffled.len(), 3);
    }

    #[test]
    fn every_track_can_follow_the_current_one() {
        let tracks = create_test_tracks(4);
        let mut rng = StdRng::seed_from_u64(99);
        let mut seen_second = HashSet::new();

        for _ in 0..200 {
            let shuffled = shuffle_keeping_current(&tracks, Some(0), &mut rng);
            seen_second.insert(shuffled[1].id.clone());
        }

        assert_eq!(seen_second.len(), 3);
    }
}
