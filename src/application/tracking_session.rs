use super::tracking_engine::{TrackingBoard, TrackingEngine};
use crate::common::{ApplicationError, ApplicationResult};
use crate::domains::feed::{FeedSubscription, MissionFeed};
use crate::domains::overlay::MapSurface;
use std::time::Duration;
use tokio::sync::watch;

/// A feed driving an engine on the polling task. Dropping the session without
/// `stop` still tears the overlay down, from the polling task.
pub struct TrackingSession<S: MapSurface> {
    subscription: FeedSubscription<TrackingEngine<S>>,
    board: watch::Receiver<TrackingBoard>,
}

impl<S: MapSurface> TrackingSession<S> {
    pub fn start(feed: MissionFeed, engine: TrackingEngine<S>, interval: Duration) -> Self {
        let board = engine.subscribe();
        let subscription = feed.subscribe(interval, engine);
        Self { subscription, board }
    }

    /// Receiver that changes after every applied snapshot or feed failure.
    pub fn board(&self) -> watch::Receiver<TrackingBoard> {
        self.board.clone()
    }

    pub fn is_running(&self) -> bool {
        self.subscription.is_running()
    }

    /// Stops polling, waits for the current cycle, then removes the overlay.
    pub async fn stop(self) -> ApplicationResult<S> {
        let mut engine = self
            .subscription
            .unsubscribe()
            .await
            .ok_or(ApplicationError::SessionStopped)?;
        engine.teardown();
        Ok(engine.into_surface())
    }
}
