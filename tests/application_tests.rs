use chrono::Utc;
use mission_tracker::adapters::inbound::InMemoryMissionSource;
use mission_tracker::adapters::outbound::{init_noop_logger, RecordingSurface};
use mission_tracker::application::{SignalState, TrackingEngine, TrackingSession, SIGNAL_LOSS_AFTER_FAILURES};
use mission_tracker::config::Config;
use mission_tracker::domains::feed::{FeedScope, MissionFeed};
use mission_tracker::domains::overlay::{CameraMode, OverlayKey};
use mission_tracker::domains::tracking::{MissionId, MissionRecord, RawLocation};
use std::sync::Arc;
use std::time::Duration;

fn in_transit(id: &str, live: (f64, f64)) -> MissionRecord {
    let mut r = MissionRecord::new(id, "IN_TRANSIT", Utc::now() + chrono::Duration::hours(20));
    r.pickup = Some(RawLocation::at(20.0, 78.0));
    r.dropoff = Some(RawLocation::at(20.1, 78.1));
    r.live_position = Some(RawLocation::at(live.0, live.1));
    r
}

fn follow_engine(id: &str) -> TrackingEngine<RecordingSurface> {
    let config = Config::default();
    TrackingEngine::new(
        RecordingSurface::new(),
        CameraMode::Follow {
            mission_id: MissionId::new(id),
            zoom: config.tracking.zoom,
        },
        config.tracking.frame_policy(),
        init_noop_logger(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_session_tracks_and_tears_down() {
    let source = Arc::new(InMemoryMissionSource::with_records(vec![in_transit("m-1", (20.05, 78.05))]));
    let feed = MissionFeed::new(
        source.clone(),
        FeedScope::Mission(MissionId::new("m-1")),
        init_noop_logger(),
    );
    let session = TrackingSession::start(feed, follow_engine("m-1"), Duration::from_millis(2000));
    let mut board = session.board();

    board.changed().await.unwrap();
    {
        let current = board.borrow_and_update();
        assert_eq!(current.signal, SignalState::Live);
        let summary = current.summary(&MissionId::new("m-1")).unwrap();
        assert_eq!((summary.distance_km, summary.eta_minutes), (7.6, 23));
    }

    // Volunteer drops out of the feed: back to waiting, live marker gone.
    let mut silent = in_transit("m-1", (0.0, 0.0));
    silent.live_position = None;
    source.upsert(silent).await;
    board.changed().await.unwrap();
    assert_eq!(board.borrow_and_update().signal, SignalState::WaitingForSignal);

    let surface = session.stop().await.unwrap();
    assert_eq!(surface.object_count(), 0);
    assert!(surface.misuse().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_source_keeps_waiting() {
    let source = Arc::new(InMemoryMissionSource::new());
    source.set_failing(true);
    let feed = MissionFeed::new(source, FeedScope::AllActive, init_noop_logger());
    let session = TrackingSession::start(feed, follow_engine("m-1"), Duration::from_millis(2000));
    let board = session.board();

    tokio::time::sleep(Duration::from_millis(6100)).await;
    {
        let current = board.borrow();
        assert_eq!(current.signal, SignalState::WaitingForSignal);
        assert!(current.consecutive_feed_failures >= 3);
        assert!(current.summaries.is_empty());
    }
    assert!(session.is_running());

    let surface = session.stop().await.unwrap();
    assert!(surface.ops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_outage_drops_live_board_until_recovery() {
    let source = Arc::new(InMemoryMissionSource::with_records(vec![in_transit("m-1", (20.05, 78.05))]));
    let feed = MissionFeed::new(
        source.clone(),
        FeedScope::Mission(MissionId::new("m-1")),
        init_noop_logger(),
    );
    let session = TrackingSession::start(feed, follow_engine("m-1"), Duration::from_millis(2000));
    let board = session.board();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(board.borrow().signal, SignalState::Live);

    source.set_failing(true);
    tokio::time::sleep(Duration::from_millis(2000 * SIGNAL_LOSS_AFTER_FAILURES as u64)).await;
    {
        let current = board.borrow();
        assert_eq!(current.signal, SignalState::WaitingForSignal);
        assert!(current.summaries.is_empty());
        assert_eq!(current.status_line(), "Waiting for volunteer signal...");
    }

    // Same data as before the outage, yet the board goes live again.
    source.set_failing(false);
    tokio::time::sleep(Duration::from_millis(2000)).await;
    {
        let current = board.borrow();
        assert_eq!(current.signal, SignalState::Live);
        assert_eq!(current.consecutive_feed_failures, 0);
        assert_eq!(current.summaries.len(), 1);
    }

    let surface = session.stop().await.unwrap();
    assert_eq!(surface.object_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_session_clears_board() {
    let source = Arc::new(InMemoryMissionSource::with_records(vec![in_transit("m-1", (20.05, 78.05))]));
    let feed = MissionFeed::new(source, FeedScope::AllActive, init_noop_logger());
    let session = TrackingSession::start(feed, follow_engine("m-1"), Duration::from_millis(2000));
    let board = session.board();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(board.borrow().signal, SignalState::Live);

    drop(session);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let current = board.borrow();
    assert_eq!(current.signal, SignalState::WaitingForSignal);
    assert!(current.summaries.is_empty());
}

#[test]
fn test_engine_without_viewer_draws_no_viewer_marker() {
    let now = Utc::now();
    let config = Config::default();
    assert!(config.source.viewer.is_none());
    let mut engine = TrackingEngine::new(
        RecordingSurface::new(),
        CameraMode::Overview {
            zoom: config.tracking.zoom,
            follow_live: false,
        },
        config.tracking.frame_policy(),
        init_noop_logger(),
    )
    .with_viewer(config.source.viewer);

    let report = engine.apply_at(&mission_tracker::MissionSnapshot::empty(now), now);
    assert!(report.created.is_empty());
    assert!(engine.reconciler().surface().object(&OverlayKey::Viewer).is_none());
}

#[test]
fn test_engine_apply_updates_viewer_marker() {
    let now = Utc::now();
    let config = Config::default();
    let mut engine = TrackingEngine::new(
        RecordingSurface::new(),
        CameraMode::Overview {
            zoom: config.tracking.zoom,
            follow_live: false,
        },
        config.tracking.frame_policy(),
        init_noop_logger(),
    )
    .with_viewer(Some(config.tracking.default_center));

    let snapshot = mission_tracker::MissionSnapshot::empty(now);
    let report = engine.apply_at(&snapshot, now);
    assert_eq!(report.created, vec![OverlayKey::Viewer]);
    assert_eq!(engine.board().signal, SignalState::WaitingForSignal);

    engine.set_viewer(None);
    let report = engine.apply_at(&snapshot, now);
    assert_eq!(report.removed, vec![OverlayKey::Viewer]);
    assert_eq!(engine.cycles(), 2);
    assert_eq!(engine.teardown(), 0);
}
