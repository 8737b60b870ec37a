use crate::common::{MissionSnapshot, TrackingError};
use crate::domains::feed::SnapshotSink;
use crate::domains::logger::DynLogger;
use crate::domains::overlay::{CameraMode, MapSurface, OverlayReconciler, ReconcileReport, Scene};
use crate::domains::tracking::{FramePolicy, GeoPoint, MissionId, TrackingSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Consecutive failed polls after which a live signal counts as lost.
pub const SIGNAL_LOSS_AFTER_FAILURES: u32 = 3;

/// Whether the tracked volunteer(s) are currently reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalState {
    #[default]
    WaitingForSignal,
    Live,
    /// The followed mission reached a terminal status.
    Finished,
}

/// What the surrounding UI shows next to the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingBoard {
    pub summaries: Vec<TrackingSummary>,
    pub signal: SignalState,
    pub mission_count: usize,
    pub consecutive_feed_failures: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TrackingBoard {
    pub fn summary(&self, id: &MissionId) -> Option<&TrackingSummary> {
        self.summaries.iter().find(|s| &s.mission_id == id)
    }

    pub fn status_line(&self) -> String {
        match self.signal {
            SignalState::WaitingForSignal => "Waiting for volunteer signal...".to_string(),
            SignalState::Finished => "Mission finished".to_string(),
            SignalState::Live => self
                .summaries
                .iter()
                .map(|s| format!("{}: {} ({} · {})", s.mission_id, s.phase_label, s.distance_text(), s.eta_text()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Runs one tracking cycle per snapshot: scene, reconciliation, board.
///
/// The engine is moved into the polling task while a session runs, so nothing
/// in here needs a lock.
pub struct TrackingEngine<S: MapSurface> {
    reconciler: OverlayReconciler<S>,
    policy: FramePolicy,
    viewer: Option<GeoPoint>,
    logger: DynLogger,
    board: watch::Sender<TrackingBoard>,
    cycles: u64,
}

impl<S: MapSurface> TrackingEngine<S> {
    pub fn new(surface: S, camera_mode: CameraMode, policy: FramePolicy, logger: DynLogger) -> Self {
        let (board, _) = watch::channel(TrackingBoard::default());
        Self {
            reconciler: OverlayReconciler::new(surface, camera_mode),
            policy,
            viewer: None,
            logger,
            board,
            cycles: 0,
        }
    }

    pub fn with_epsilon(mut self, epsilon_deg: f64) -> Self {
        self.reconciler = self.reconciler.with_epsilon(epsilon_deg);
        self
    }

    pub fn with_viewer(mut self, viewer: Option<GeoPoint>) -> Self {
        self.viewer = viewer;
        self
    }

    /// Takes effect on the next cycle.
    pub fn set_viewer(&mut self, viewer: Option<GeoPoint>) {
        self.viewer = viewer;
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackingBoard> {
        self.board.subscribe()
    }

    pub fn board(&self) -> TrackingBoard {
        self.board.borrow().clone()
    }

    pub fn reconciler(&self) -> &OverlayReconciler<S> {
        &self.reconciler
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn apply(&mut self, snapshot: &MissionSnapshot) -> ReconcileReport {
        self.apply_at(snapshot, Utc::now())
    }

    /// One full cycle with an explicit clock, for urgency decisions.
    pub fn apply_at(&mut self, snapshot: &MissionSnapshot, now: DateTime<Utc>) -> ReconcileReport {
        let scene = Scene::build(&snapshot.missions, &self.policy, now, self.viewer);
        let report = self.reconciler.reconcile(&scene);
        self.cycles += 1;

        let summaries: Vec<TrackingSummary> = scene.frames().map(|f| f.summary()).collect();
        let signal = self.signal_for(snapshot, !summaries.is_empty());

        if !report.is_noop() {
            self.logger.debug(&format!(
                "Cycle {}: {} created, {} updated, {} removed",
                self.cycles,
                report.created.len(),
                report.updated.len(),
                report.removed.len()
            ));
        }
        let previous = self.board.borrow().signal;
        if previous != signal {
            self.logger.info(&format!("Signal {:?} -> {:?}", previous, signal));
        }

        self.board.send_replace(TrackingBoard {
            summaries,
            signal,
            mission_count: scene.missions.len(),
            consecutive_feed_failures: 0,
            updated_at: Some(now),
        });
        report
    }

    fn signal_for(&self, snapshot: &MissionSnapshot, any_live: bool) -> SignalState {
        if let CameraMode::Follow { mission_id, .. } = self.reconciler.camera_mode() {
            if snapshot
                .mission(mission_id)
                .map(|m| m.status.is_terminal())
                .unwrap_or(false)
            {
                return SignalState::Finished;
            }
        }
        if any_live {
            SignalState::Live
        } else {
            SignalState::WaitingForSignal
        }
    }

    /// Removes the whole overlay and resets the board.
    pub fn teardown(&mut self) -> usize {
        let removed = self.reconciler.teardown();
        self.board.send_replace(TrackingBoard::default());
        self.logger.info(&format!("Overlay torn down ({} objects removed)", removed));
        removed
    }

    pub fn into_surface(self) -> S {
        self.reconciler.into_surface()
    }
}

impl<S: MapSurface> SnapshotSink for TrackingEngine<S> {
    fn on_snapshot(&mut self, snapshot: &MissionSnapshot) {
        self.apply(snapshot);
    }

    /// The overlay is left as it was. After `SIGNAL_LOSS_AFTER_FAILURES`
    /// failures in a row a live board drops back to waiting and its
    /// summaries are cleared; a finished mission stays finished.
    fn on_feed_error(&mut self, error: &TrackingError) {
        let mut lost = false;
        self.board.send_modify(|board| {
            board.consecutive_feed_failures = board.consecutive_feed_failures.saturating_add(1);
            if board.consecutive_feed_failures >= SIGNAL_LOSS_AFTER_FAILURES && board.signal == SignalState::Live {
                board.signal = SignalState::WaitingForSignal;
                board.summaries.clear();
                lost = true;
            }
        });
        if lost {
            self.logger.info(&format!("Signal lost after repeated feed errors: {}", error));
        } else {
            self.logger.debug(&format!("Keeping last overlay after feed error: {}", error));
        }
    }

    fn on_detached(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::{init_noop_logger, RecordingSurface};
    use crate::domains::overlay::DEFAULT_ZOOM;
    use crate::domains::tracking::{Mission, MissionStatus};
    use chrono::Duration;

    fn transit(now: DateTime<Utc>) -> Mission {
        Mission::new(
            "m-1",
            GeoPoint::new(20.0, 78.0).unwrap(),
            MissionStatus::InTransit,
            now + Duration::hours(20),
        )
        .with_dropoff(GeoPoint::new(20.1, 78.1).unwrap())
        .with_live_position(GeoPoint::new(20.05, 78.05).unwrap())
    }

    fn engine(mode: CameraMode) -> TrackingEngine<RecordingSurface> {
        TrackingEngine::new(RecordingSurface::new(), mode, FramePolicy::default(), init_noop_logger())
    }

    #[test]
    fn board_reports_live_summary() {
        let now = Utc::now();
        let mut engine = engine(CameraMode::Overview {
            zoom: DEFAULT_ZOOM,
            follow_live: false,
        });
        engine.apply_at(&MissionSnapshot::new(vec![transit(now)], now), now);

        let board = engine.board();
        assert_eq!(board.signal, SignalState::Live);
        let summary = board.summary(&MissionId::new("m-1")).unwrap();
        assert_eq!(summary.distance_km, 7.6);
        assert_eq!(summary.eta_minutes, 23);
        assert_eq!(summary.phase_label, "Delivering Order");
    }

    #[test]
    fn followed_mission_finishing_is_reported() {
        let now = Utc::now();
        let mut engine = engine(CameraMode::Follow {
            mission_id: MissionId::new("m-1"),
            zoom: DEFAULT_ZOOM,
        });
        engine.apply_at(&MissionSnapshot::new(vec![transit(now)], now), now);
        assert!(!engine.reconciler().is_empty());

        let mut done = transit(now);
        done.status = MissionStatus::Completed;
        engine.apply_at(&MissionSnapshot::new(vec![done], now), now);

        assert_eq!(engine.board().signal, SignalState::Finished);
        assert!(engine.reconciler().is_empty());
    }

    #[test]
    fn repeated_feed_errors_drop_live_signal() {
        let now = Utc::now();
        let mut engine = engine(CameraMode::Follow {
            mission_id: MissionId::new("m-1"),
            zoom: DEFAULT_ZOOM,
        });
        engine.apply_at(&MissionSnapshot::new(vec![transit(now)], now), now);
        let objects = engine.reconciler().surface().object_count();
        let error = TrackingError::feed_unavailable("offline");

        for _ in 1..SIGNAL_LOSS_AFTER_FAILURES {
            engine.on_feed_error(&error);
        }
        assert_eq!(engine.board().signal, SignalState::Live);
        assert_eq!(engine.board().summaries.len(), 1);

        engine.on_feed_error(&error);
        let board = engine.board();
        assert_eq!(board.signal, SignalState::WaitingForSignal);
        assert!(board.summaries.is_empty());
        assert_eq!(board.status_line(), "Waiting for volunteer signal...");
        assert_eq!(engine.reconciler().surface().object_count(), objects);

        // Recovery restores the live board and resets the counter.
        engine.apply_at(&MissionSnapshot::new(vec![transit(now)], now), now);
        assert_eq!(engine.board().signal, SignalState::Live);
        assert_eq!(engine.board().consecutive_feed_failures, 0);
    }

    #[test]
    fn finished_mission_survives_feed_errors() {
        let now = Utc::now();
        let mut engine = engine(CameraMode::Follow {
            mission_id: MissionId::new("m-1"),
            zoom: DEFAULT_ZOOM,
        });
        let mut done = transit(now);
        done.status = MissionStatus::Completed;
        engine.apply_at(&MissionSnapshot::new(vec![done], now), now);

        let error = TrackingError::feed_unavailable("offline");
        for _ in 0..SIGNAL_LOSS_AFTER_FAILURES {
            engine.on_feed_error(&error);
        }
        assert_eq!(engine.board().signal, SignalState::Finished);
    }

    #[test]
    fn pickup_turns_urgent_as_time_passes() {
        use crate::adapters::outbound::RecordedObject;
        use crate::domains::overlay::{OverlayKey, AVAILABLE_COLOR, URGENT_COLOR};

        let now = Utc::now();
        let posting = Mission::new(
            "m-9",
            GeoPoint::new(20.0, 78.0).unwrap(),
            MissionStatus::Open,
            now + Duration::hours(13),
        );
        let snapshot = MissionSnapshot::new(vec![posting], now);
        let mut engine = engine(CameraMode::Overview {
            zoom: DEFAULT_ZOOM,
            follow_live: false,
        });
        let key = OverlayKey::pickup(&MissionId::new("m-9"));
        let color = |engine: &TrackingEngine<RecordingSurface>| match engine.reconciler().surface().object(&key) {
            Some(RecordedObject::Marker { appearance, .. }) => appearance.variant.color,
            other => panic!("expected pickup marker, got {:?}", other),
        };

        engine.apply_at(&snapshot, now);
        assert_eq!(color(&engine), AVAILABLE_COLOR);

        let report = engine.apply_at(&snapshot, now + Duration::hours(2));
        assert_eq!(report.updated, vec![key.clone()]);
        assert_eq!(color(&engine), URGENT_COLOR);
    }

    #[test]
    fn detaching_tears_down_overlay() {
        let now = Utc::now();
        let mut engine = engine(CameraMode::Overview {
            zoom: DEFAULT_ZOOM,
            follow_live: false,
        });
        engine.apply_at(&MissionSnapshot::new(vec![transit(now)], now), now);
        assert!(!engine.reconciler().is_empty());

        engine.on_detached();
        assert!(engine.reconciler().is_empty());
        assert_eq!(engine.reconciler().surface().object_count(), 0);
        assert_eq!(engine.board(), TrackingBoard::default());
    }

    #[test]
    fn feed_errors_leave_waiting_state_and_overlay() {
        let mut engine = engine(CameraMode::Overview {
            zoom: DEFAULT_ZOOM,
            follow_live: true,
        });
        let error = TrackingError::feed_unavailable("offline");
        engine.on_feed_error(&error);
        engine.on_feed_error(&error);

        let board = engine.board();
        assert_eq!(board.signal, SignalState::WaitingForSignal);
        assert_eq!(board.consecutive_feed_failures, 2);
        assert_eq!(board.status_line(), "Waiting for volunteer signal...");
        assert_eq!(engine.reconciler().surface().object_count(), 0);
    }
}
