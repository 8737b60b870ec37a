use crate::common::{MissionSnapshot, TrackingError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Receives snapshots from a running feed. Called on the polling task, one call
/// at a time, so implementations need no locking.
pub trait SnapshotSink: Send + 'static {
    fn on_snapshot(&mut self, snapshot: &MissionSnapshot);

    fn on_feed_error(&mut self, _error: &TrackingError) {}

    /// The subscription handle was dropped without `unsubscribe`. Last call the
    /// sink receives before the polling task exits.
    fn on_detached(&mut self) {}
}

impl<F> SnapshotSink for F
where
    F: FnMut(&MissionSnapshot) + Send + 'static,
{
    fn on_snapshot(&mut self, snapshot: &MissionSnapshot) {
        self(snapshot)
    }
}

/// Handle to a running feed. `unsubscribe` stops it and returns the sink.
/// Dropping it stops polling at the next await point and the task calls
/// `SnapshotSink::on_detached` before exiting.
pub struct FeedSubscription<K: SnapshotSink> {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<K>>,
}

impl<K: SnapshotSink> FeedSubscription<K> {
    pub(super) fn new(stop: oneshot::Sender<()>, task: JoinHandle<K>) -> Self {
        Self {
            stop: Some(stop),
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Stops the timer and waits for the polling task to exit. No sink callback
    /// runs after this returns. `None` if the task panicked.
    pub async fn unsubscribe(mut self) -> Option<K> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let task = self.task.take()?;
        task.await.ok()
    }
}
