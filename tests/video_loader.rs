use portfolio_wasm::video::{Effect, LoaderConfig, LoaderSession, ReadyState, VideoState};

fn session_with(videos: &[(usize, &str)]) -> LoaderSession {
    let mut session = LoaderSession::new(LoaderConfig::default());
    for (index, src) in videos {
        session.register(*index, src).unwrap();
    }
    session
}

fn play_through(session: &mut LoaderSession, index: usize) {
    session.on_intersection(index, true, 1.0);
    session.on_loaded_data(index);
    session.on_play_resolved(index);
    assert_eq!(session.state(index), Some(VideoState::Playing));
}

#[test]
fn intersection_loads_once() {
    let mut session = session_with(&[(0, "media/a.mp4")]);

    let first = session.on_intersection(0, true, 0.3);
    assert_eq!(
        first,
        vec![
            Effect::StopObserving,
            Effect::ShowSpinner,
            Effect::BeginLoad {
                src: "media/a.mp4".into()
            },
        ]
    );

    // Observer callbacks queued before unobserve took effect.
    for _ in 0..5 {
        assert!(session.on_intersection(0, true, 0.9).is_empty());
    }
    assert!(session.load_video(0).is_empty());
    assert_eq!(session.state(0), Some(VideoState::Loading));
}

#[test]
fn load_video_is_idempotent_per_index() {
    let mut session = session_with(&[(0, "a.mp4"), (1, "b.mp4")]);
    let begins = (0..4)
        .flat_map(|_| [0, 1, 0])
        .flat_map(|index| session.load_video(index))
        .filter(|e| matches!(e, Effect::BeginLoad { .. }))
        .count();
    assert_eq!(begins, 2);
}

#[test]
fn no_loaded_event_means_no_playback() {
    let mut session = session_with(&[(3, "c.mp4")]);
    session.on_intersection(3, true, 1.0);
    assert!(session.on_play_resolved(3).is_empty());
    assert!(session.on_visibility(3, 1.0, ReadyState::HaveEnoughData).is_empty());
    assert_eq!(session.state(3), Some(VideoState::Loading));
    assert!(!session.is_loaded(3));
}

#[test]
fn load_failure_shows_glyph_and_never_plays() {
    let mut session = session_with(&[(0, "broken.mp4")]);
    session.on_intersection(0, true, 1.0);
    assert_eq!(session.on_load_error(0), vec![Effect::ShowErrorGlyph]);
    assert_eq!(session.state(0), Some(VideoState::Errored));

    // A late loadeddata must not resurrect it.
    assert!(session.on_loaded_data(0).is_empty());
    assert!(session.on_play_resolved(0).is_empty());
    assert_eq!(session.state(0), Some(VideoState::Errored));
    assert_eq!(session.loaded_count(), 0);
}

#[test]
fn loaded_video_requests_playback() {
    let mut session = session_with(&[(0, "a.mp4")]);
    session.on_intersection(0, true, 1.0);
    assert_eq!(
        session.on_loaded_data(0),
        vec![Effect::MarkLoaded, Effect::RequestPlay]
    );
    assert!(session.is_loaded(0));
    assert_eq!(
        session.on_play_resolved(0),
        vec![Effect::ClearOverlay, Effect::WatchVisibility]
    );
}

#[test]
fn blocked_autoplay_offers_manual_play() {
    let mut session = session_with(&[(0, "a.mp4")]);
    session.on_intersection(0, true, 1.0);
    session.on_loaded_data(0);

    assert_eq!(session.on_play_rejected(0), vec![Effect::ShowPlayButton]);
    assert_eq!(session.state(0), Some(VideoState::AutoplayBlocked));

    assert_eq!(
        session.on_manual_play(0),
        vec![Effect::ClearOverlay, Effect::RequestPlay]
    );
    assert!(session.on_manual_play(0).is_empty());
    session.on_play_resolved(0);
    assert_eq!(session.state(0), Some(VideoState::Playing));
}

#[test]
fn scrolling_away_pauses_and_back_resumes() {
    let mut session = session_with(&[(0, "a.mp4")]);
    play_through(&mut session, 0);

    assert_eq!(
        session.on_visibility(0, 0.2, ReadyState::HaveEnoughData),
        vec![Effect::Pause]
    );
    assert_eq!(session.state(0), Some(VideoState::Paused));

    assert_eq!(
        session.on_visibility(0, 0.75, ReadyState::HaveFutureData),
        vec![Effect::Resume]
    );
    assert_eq!(session.state(0), Some(VideoState::Playing));
}

#[test]
fn unready_media_stays_paused() {
    let mut session = session_with(&[(0, "a.mp4")]);
    play_through(&mut session, 0);
    session.on_visibility(0, 0.0, ReadyState::HaveEnoughData);

    assert!(session
        .on_visibility(0, 1.0, ReadyState::HaveCurrentData)
        .is_empty());
    assert_eq!(session.state(0), Some(VideoState::Paused));
}

#[test]
fn manual_play_still_registers_visibility_watch() {
    let mut session = session_with(&[(0, "a.mp4")]);
    session.on_intersection(0, true, 1.0);
    session.on_loaded_data(0);
    session.on_play_rejected(0);
    session.on_manual_play(0);
    assert_eq!(
        session.on_play_resolved(0),
        vec![Effect::ClearOverlay, Effect::WatchVisibility]
    );
}

#[test]
fn eager_fallback_loads_everything_once() {
    let mut session = session_with(&[(0, "a.mp4"), (1, "b.mp4"), (2, "c.mp4")]);
    session.on_intersection(1, true, 1.0);

    let batches = session.eager_load_all();
    let indices: Vec<usize> = batches.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 2]);
    assert!(session.indices().all(|i| session.state(i) == Some(VideoState::Loading)));
    assert!(session.eager_load_all().is_empty());
}

#[test]
fn teardown_clears_registries_and_ignores_late_events() {
    let mut session = session_with(&[(0, "a.mp4"), (1, "b.mp4")]);
    play_through(&mut session, 0);
    session.on_intersection(1, true, 1.0);

    assert_eq!(session.teardown(), vec![Effect::DisconnectAll]);
    assert!(session.is_torn_down());
    assert!(session.is_empty());
    assert_eq!(session.loaded_count(), 0);

    assert!(session.on_loaded_data(1).is_empty());
    assert!(session.load_video(0).is_empty());
    assert!(session.teardown().is_empty());
}

#[test]
fn unknown_index_is_ignored_without_poisoning_seen_set() {
    let mut session = session_with(&[(0, "a.mp4")]);

    assert!(session.on_intersection(99, true, 1.0).is_empty());
    assert!(session.on_loaded_data(99).is_empty());
    assert!(session.on_load_error(99).is_empty());
    assert!(session.on_play_resolved(99).is_empty());
    assert!(session.on_visibility(99, 1.0, ReadyState::HaveEnoughData).is_empty());
    assert!(session.load_video(99).is_empty());
    assert_eq!(session.state(99), None);
    assert_eq!(session.state(0), Some(VideoState::Unloaded));

    session.register(99, "late.mp4").unwrap();
    assert_eq!(
        session.load_video(99),
        vec![
            Effect::ShowSpinner,
            Effect::BeginLoad {
                src: "late.mp4".into()
            },
        ]
    );
}
