use crate::domains::tracking::{is_urgent, GeoPoint, Mission, MissionId, MissionStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The full mission set observed by one successful poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSnapshot {
    pub snapshot_id: Uuid,
    pub missions: Vec<Mission>,
    pub taken_at: DateTime<Utc>,
}

impl MissionSnapshot {
    /// Missions are stored ordered by id so two polls of the same data compare equal.
    pub fn new(mut missions: Vec<Mission>, taken_at: DateTime<Utc>) -> Self {
        missions.sort_by(|a, b| a.id.cmp(&b.id));
        missions.dedup_by(|a, b| a.id == b.id);
        Self {
            snapshot_id: Uuid::new_v4(),
            missions,
            taken_at,
        }
    }

    pub fn empty(taken_at: DateTime<Utc>) -> Self {
        Self::new(Vec::new(), taken_at)
    }

    pub fn mission(&self, id: &MissionId) -> Option<&Mission> {
        self.missions.iter().find(|m| &m.id == id)
    }

    /// Fingerprint as seen at `now`. Urgency is part of it, so a mission
    /// crossing into its urgency `window` changes the digest without any
    /// stored field changing.
    pub fn digest(&self, now: DateTime<Utc>, window: Duration) -> SnapshotDigest {
        SnapshotDigest(
            self.missions
                .iter()
                .map(|m| MissionDigest {
                    id: m.id.clone(),
                    status: m.status,
                    pickup: m.pickup,
                    dropoff: m.dropoff,
                    live_position: m.live_position,
                    expires_at: m.expires_at,
                    urgent: is_urgent(m.expires_at, now, window),
                })
                .collect(),
        )
    }
}

/// Content fingerprint used for change detection between polls.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDigest(Vec<MissionDigest>);

#[derive(Debug, Clone, PartialEq)]
struct MissionDigest {
    id: MissionId,
    status: MissionStatus,
    pickup: GeoPoint,
    dropoff: Option<GeoPoint>,
    live_position: Option<GeoPoint>,
    expires_at: DateTime<Utc>,
    urgent: bool,
}
