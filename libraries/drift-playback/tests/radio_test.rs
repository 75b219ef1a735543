//! Radio mode tests

mod common;

use common::*;
use drift_core::{CollectionId, EngineEvent, FetchError, TrackId};
use drift_playback::PlaybackStatus;
use std::time::Duration;

#[tokio::test]
async fn fresh_session_appends_related_tracks() {
    let h = Harness::start();
    h.related.push(Ok(tracks(&["B", "C"])));

    h.player.play_track(track("A"), true).await.unwrap();
    let started = h.player.state();
    assert!(started.radio_mode);
    assert_eq!(started.source_id, Some(CollectionId::radio(&TrackId::new("A"))));

    let state = wait_for_state(&h.player, |s| s.queue.len() == 3).await;
    assert_eq!(queue_ids(&state), vec!["A", "B", "C"]);
    assert_eq!(state.revision, started.revision + 1);
    assert_eq!(state.current_index, Some(0));
    assert_eq!(h.related.calls()[0], "A");
}

#[tokio::test]
async fn duplicate_batches_never_grow_the_queue() {
    let h = Harness::start();
    h.related.always(tracks(&["S", "S", "S"]));

    h.player.play_track(track("S"), true).await.unwrap();
    let started = wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing).await;
    let related = h.related.clone();
    eventually(|| !related.calls().is_empty()).await;

    h.engine.emit(EngineEvent::completed());
    let state = wait_for_state(&h.player, |s| s.status == PlaybackStatus::Idle).await;

    assert_eq!(queue_ids(&state), vec!["S"]);
    assert_eq!(state.revision, started.revision);
    assert!(!state.is_playing);
    assert!(state.radio_mode);
    assert!(h.related.calls().iter().all(|seed| seed == "S"));
}

#[tokio::test]
async fn end_of_queue_waits_for_radio_then_advances() {
    let h = Harness::start();
    let gate = h.related.gate();

    h.player.play_track(track("A"), true).await.unwrap();
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing && s.radio_fetching).await;

    h.engine.emit(EngineEvent::completed());
    let waiting = wait_for_state(&h.player, |s| s.status == PlaybackStatus::Loading).await;
    assert_eq!(waiting.current_index, Some(0));

    h.related.push(Ok(tracks(&["B"])));
    gate.notify_one();

    let state = wait_for_state(&h.player, |s| {
        s.status == PlaybackStatus::Playing && s.current_index == Some(1)
    })
    .await;
    assert_eq!(queue_ids(&state), vec!["A", "B"]);
    assert_eq!(state.current_track.unwrap().id.as_str(), "B");
    assert!(state.radio_mode);
}

#[tokio::test]
async fn end_of_queue_settles_idle_when_radio_finds_nothing() {
    let h = Harness::start();
    let gate = h.related.gate();

    h.player.play_track(track("A"), true).await.unwrap();
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing && s.radio_fetching).await;

    h.engine.emit(EngineEvent::completed());
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Loading).await;

    h.related.push(Ok(tracks(&["A"])));
    gate.notify_one();

    let state = wait_for_state(&h.player, |s| s.status == PlaybackStatus::Idle).await;
    assert!(!state.is_playing);
    assert_eq!(queue_ids(&state), vec!["A"]);
}

#[tokio::test]
async fn pause_while_waiting_for_radio_is_kept() {
    let h = Harness::start();
    let gate = h.related.gate();

    h.player.play_track(track("A"), true).await.unwrap();
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing && s.radio_fetching).await;

    h.engine.emit(EngineEvent::completed());
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Loading).await;
    h.player.pause().await.unwrap();

    h.related.push(Ok(tracks(&["B"])));
    gate.notify_one();

    let state = wait_for_state(&h.player, |s| {
        s.current_index == Some(1) && s.status != PlaybackStatus::Loading
    })
    .await;
    assert_eq!(state.status, PlaybackStatus::Paused);
    assert!(!state.is_playing);
    assert_eq!(state.current_track.unwrap().id.as_str(), "B");
    assert_eq!(h.engine.calls().last(), Some(&EngineCall::SetSource(stream_url("B"))));
}

#[tokio::test]
async fn only_one_fetch_is_in_flight() {
    let h = Harness::start();
    let gate = h.related.gate();

    h.player.play_track(track("A"), true).await.unwrap();
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing).await;

    h.player.add_to_queue(tracks(&["X"])).await.unwrap();
    // The successful load of A asked for more tracks; that request was dropped.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.related.calls().len(), 1);
    assert!(h.player.state().radio_fetching);

    h.related.push(Ok(tracks(&["B", "C"])));
    gate.notify_one();

    let state = wait_for_state(&h.player, |s| s.queue.len() == 4).await;
    assert_eq!(queue_ids(&state), vec!["A", "X", "B", "C"]);
    assert!(!state.radio_fetching);
    assert_eq!(h.related.calls().len(), 1);
}

#[tokio::test]
async fn queued_tracks_are_not_fetched_twice() {
    let h = Harness::start();
    let gate = h.related.gate();

    h.player.play_track(track("A"), true).await.unwrap();
    h.player.add_to_queue(tracks(&["X"])).await.unwrap();

    h.related.push(Ok(tracks(&["X", "B"])));
    gate.notify_one();

    let state = wait_for_state(&h.player, |s| s.queue.len() == 3).await;
    assert_eq!(queue_ids(&state), vec!["A", "X", "B"]);
}

#[tokio::test]
async fn failed_fetch_keeps_radio_on() {
    let h = Harness::start();
    let gate = h.related.gate();
    h.related.push(Err(FetchError::Timeout));

    h.player.play_track(track("A"), true).await.unwrap();
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing).await;
    gate.notify_one();

    let state = wait_for_state(&h.player, |s| !s.radio_fetching).await;
    assert!(state.radio_mode);
    assert!(state.error.is_none());
    assert_eq!(queue_ids(&state), vec!["A"]);
}

#[tokio::test]
async fn continuation_keeps_radio_and_explicit_play_disables_it() {
    let h = Harness::start();
    h.player.play_track(track("A"), true).await.unwrap();
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing).await;

    let station = CollectionId::radio(&TrackId::new("A"));
    h.player
        .play_queue(tracks(&["A", "P", "Q"]), 1, Some(station.clone()))
        .await
        .unwrap();
    let state = h.player.state();
    assert!(state.radio_mode);
    assert_eq!(state.source_id, Some(station));

    h.player
        .play_queue(tracks(&["M", "N"]), 0, Some(CollectionId::new("pl1")))
        .await
        .unwrap();
    let state = h.player.state();
    assert!(!state.radio_mode);
    assert!(!state.radio_fetching);
}

#[tokio::test]
async fn play_track_without_radio_has_no_source() {
    let h = Harness::start();
    h.player.play_track(track("A"), false).await.unwrap();

    let state = wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing).await;
    assert!(!state.radio_mode);
    assert_eq!(state.source_id, None);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.related.calls().is_empty());
}

#[tokio::test]
async fn clear_ends_radio_session() {
    let h = Harness::start();
    let _gate = h.related.gate();
    h.player.play_track(track("A"), true).await.unwrap();
    h.player.clear().await.unwrap();

    let state = h.player.state();
    assert!(!state.radio_mode);
    assert!(!state.radio_fetching);
    assert!(state.queue.is_empty());
    assert_eq!(state.status, PlaybackStatus::Idle);
}

#[tokio::test]
async fn queue_bound_caps_radio_growth() {
    let mut config = drift_playback::PlayerConfig::default();
    config.radio.max_queue_len = 3;
    let h = Harness::start_with(config);
    h.related.push(Ok(tracks(&["B", "C", "D", "E"])));

    h.player.play_track(track("A"), true).await.unwrap();
    let state = wait_for_state(&h.player, |s| s.queue.len() == 3).await;
    assert_eq!(queue_ids(&state), vec!["A", "B", "C"]);

    h.related.always(tracks(&["F"]));
    h.player.skip_to_next().await.unwrap();
    wait_for_state(&h.player, |s| s.status == PlaybackStatus::Playing && s.current_index == Some(1)).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.player.state().queue.len(), 3);
}

/// Start a radio session whose first batch leaves `A` followed by B..H
async fn radio_with_seven_ahead(h: &Harness) {
    h.related.push(Ok(tracks(&["B", "C", "D", "E", "F", "G", "H"])));
    h.player.play_track(track("A"), true).await.unwrap();
    wait_for_state(&h.player, |s| {
        s.status == PlaybackStatus::Playing && s.queue.len() == 8 && !s.radio_fetching
    })
    .await;
    assert_eq!(h.related.calls().len(), 1);
}

#[tokio::test]
async fn removals_below_watermark_extend_radio() {
    let h = Harness::start();
    radio_with_seven_ahead(&h).await;

    h.player.remove_at(7).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.related.calls().len(), 1);

    h.player.remove_at(6).await.unwrap();
    let related = h.related.clone();
    eventually(|| related.calls().len() == 2).await;
}

#[tokio::test]
async fn reorder_below_watermark_extends_radio() {
    let h = Harness::start();
    radio_with_seven_ahead(&h).await;

    h.player.reorder(0, 2).await.unwrap();
    let state = h.player.state();
    assert_eq!(state.current_index, Some(2));
    assert_eq!(state.status, PlaybackStatus::Playing);

    let related = h.related.clone();
    eventually(|| related.calls().len() == 2).await;
}
