use super::subscription::{FeedSubscription, SnapshotSink};
use crate::common::{DomainResult, MissionSnapshot, SnapshotDigest, TrackingError};
use crate::domains::logger::DynLogger;
use crate::domains::tracking::{Mission, MissionId, MissionReadSource, MissionRecord, DEFAULT_URGENCY_WINDOW_HOURS};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{self, MissedTickBehavior};

/// Which part of the store a feed watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// Every active mission, as shown on the overview map.
    AllActive,
    /// A single mission, as shown in the live tracking view.
    Mission(MissionId),
}

/// Fixed-rate poller over a `MissionReadSource`.
pub struct MissionFeed {
    source: Arc<dyn MissionReadSource>,
    scope: FeedScope,
    logger: DynLogger,
    urgency_window: chrono::Duration,
}

impl MissionFeed {
    pub fn new(source: Arc<dyn MissionReadSource>, scope: FeedScope, logger: DynLogger) -> Self {
        Self {
            source,
            scope,
            logger,
            urgency_window: chrono::Duration::hours(DEFAULT_URGENCY_WINDOW_HOURS),
        }
    }

    /// Window used to notice missions becoming urgent between otherwise identical polls.
    pub fn with_urgency_window(mut self, window: chrono::Duration) -> Self {
        self.urgency_window = window;
        self
    }

    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }

    async fn fetch(&self) -> DomainResult<Vec<MissionRecord>> {
        let fetched = match &self.scope {
            FeedScope::AllActive => self.source.list_active_missions().await,
            FeedScope::Mission(id) => self
                .source
                .get_mission(id)
                .await
                .map(|found| found.into_iter().collect()),
        };
        fetched.map_err(|e| match e {
            TrackingError::FeedUnavailable { .. } => e,
            other => TrackingError::feed_unavailable(other.to_string()),
        })
    }

    /// One fetch + normalisation, without change detection.
    pub async fn poll_once(&self) -> DomainResult<MissionSnapshot> {
        let records = self.fetch().await?;
        Ok(MissionSnapshot::new(self.normalize(records), Utc::now()))
    }

    fn normalize(&self, records: Vec<MissionRecord>) -> Vec<Mission> {
        records
            .into_iter()
            .filter_map(|record| match Mission::try_from(record) {
                Ok(mission) => Some(mission),
                Err(e @ TrackingError::UnknownStatus { .. }) => {
                    self.logger.warn(&format!("Skipping mission: {}", e));
                    None
                }
                Err(e) => {
                    self.logger.debug(&format!("Skipping mission this cycle: {}", e));
                    None
                }
            })
            .collect()
    }

    /// Polls every `period` and hands changed snapshots to `sink`.
    ///
    /// Ticks that fall behind are delayed rather than bursted, so at most one poll
    /// is ever in flight. Fetch failures are logged and retried on the next tick;
    /// the first successful poll after a failure is always delivered.
    ///
    /// If the returned handle is dropped instead of unsubscribed, the task stops
    /// at its next await point and calls `SnapshotSink::on_detached`.
    pub fn subscribe<K: SnapshotSink>(self, period: Duration, mut sink: K) -> FeedSubscription<K> {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut detector = ChangeDetector::new(self.urgency_window);

            // An `Err` from the stop channel means the handle was dropped.
            let detached = loop {
                tokio::select! {
                    biased;
                    stop = &mut stop_rx => break stop.is_err(),
                    _ = ticker.tick() => {}
                }

                // A fetch still running when unsubscribe arrives is dropped unapplied.
                let polled = tokio::select! {
                    biased;
                    stop = &mut stop_rx => break stop.is_err(),
                    polled = self.poll_once() => polled,
                };

                match polled {
                    Ok(snapshot) => {
                        if detector.observe(&snapshot, Utc::now()) {
                            sink.on_snapshot(&snapshot);
                        } else {
                            self.logger.debug("Snapshot unchanged; skipping downstream work");
                        }
                    }
                    Err(e) => {
                        self.logger.warn(&format!("Poll failed, retrying next tick: {}", e));
                        detector.reset();
                        sink.on_feed_error(&e);
                    }
                }
            };

            if detached {
                self.logger.debug("Subscription handle dropped; detaching sink");
                sink.on_detached();
            }
            sink
        });

        FeedSubscription::new(stop_tx, task)
    }
}

/// Remembers the last delivered snapshot's content, including which missions
/// were urgent at the time.
#[derive(Debug)]
pub struct ChangeDetector {
    last: Option<SnapshotDigest>,
    urgency_window: chrono::Duration,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(chrono::Duration::hours(DEFAULT_URGENCY_WINDOW_HOURS))
    }
}

impl ChangeDetector {
    pub fn new(urgency_window: chrono::Duration) -> Self {
        Self {
            last: None,
            urgency_window,
        }
    }

    /// True when `snapshot`, evaluated at `now`, differs from the previously observed one.
    pub fn observe(&mut self, snapshot: &MissionSnapshot, now: DateTime<Utc>) -> bool {
        let digest = snapshot.digest(now, self.urgency_window);
        if self.last.as_ref() == Some(&digest) {
            return false;
        }
        self.last = Some(digest);
        true
    }

    /// Forgets the last snapshot so the next one is delivered regardless.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tracking::{GeoPoint, MissionStatus};
    use chrono::TimeZone;

    fn mission(id: &str, live: Option<(f64, f64)>) -> Mission {
        let m = Mission::new(
            id,
            GeoPoint::new(20.0, 78.0).unwrap(),
            MissionStatus::InTransit,
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        );
        match live {
            Some((lat, lng)) => m.with_live_position(GeoPoint::new(lat, lng).unwrap()),
            None => m,
        }
    }

    #[test]
    fn detector_ignores_identical_content() {
        let mut detector = ChangeDetector::default();
        let now = Utc::now();
        let first = MissionSnapshot::new(vec![mission("a", Some((20.0, 78.0)))], now);
        let again = MissionSnapshot::new(vec![mission("a", Some((20.0, 78.0)))], now);
        assert!(detector.observe(&first, now));
        assert!(!detector.observe(&again, now));
    }

    #[test]
    fn detector_sees_movement_and_membership() {
        let mut detector = ChangeDetector::default();
        let now = Utc::now();
        assert!(detector.observe(&MissionSnapshot::new(vec![mission("a", None)], now), now));
        assert!(detector.observe(&MissionSnapshot::new(vec![mission("a", Some((20.0, 78.0)))], now), now));
        assert!(detector.observe(
            &MissionSnapshot::new(vec![mission("a", Some((20.0, 78.0))), mission("b", None)], now),
            now
        ));
        assert!(detector.observe(&MissionSnapshot::empty(now), now));
    }

    #[test]
    fn detector_is_order_insensitive() {
        let mut detector = ChangeDetector::default();
        let now = Utc::now();
        let ab = MissionSnapshot::new(vec![mission("a", None), mission("b", None)], now);
        let ba = MissionSnapshot::new(vec![mission("b", None), mission("a", None)], now);
        assert!(detector.observe(&ab, now));
        assert!(!detector.observe(&ba, now));
    }

    #[test]
    fn detector_notices_urgency_crossing() {
        let now = Utc::now();
        let posting = Mission::new(
            "a",
            GeoPoint::new(20.0, 78.0).unwrap(),
            MissionStatus::Open,
            now + chrono::Duration::hours(12) + chrono::Duration::minutes(5),
        );
        let snapshot = MissionSnapshot::new(vec![posting], now);
        let mut detector = ChangeDetector::new(chrono::Duration::hours(12));

        assert!(detector.observe(&snapshot, now));
        assert!(!detector.observe(&snapshot, now + chrono::Duration::minutes(1)));
        // Same stored data, but the posting is now inside the urgency window.
        assert!(detector.observe(&snapshot, now + chrono::Duration::minutes(6)));
        assert!(!detector.observe(&snapshot, now + chrono::Duration::minutes(7)));
    }

    #[test]
    fn reset_forces_redelivery() {
        let now = Utc::now();
        let snapshot = MissionSnapshot::new(vec![mission("a", None)], now);
        let mut detector = ChangeDetector::default();
        assert!(detector.observe(&snapshot, now));
        detector.reset();
        assert!(detector.observe(&snapshot, now));
    }
}
