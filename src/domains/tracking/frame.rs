use super::geo::{distance_km, round_to_tenth, EtaPolicy, GeoPoint};
use super::mission::{is_urgent, Mission, MissionId, DEFAULT_URGENCY_WINDOW_HOURS};
use super::target::{resolve, Phase, TargetKind};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest urgency window accepted from configuration, about a thousand years.
pub const MAX_URGENCY_WINDOW_HOURS: i64 = 24 * 365 * 1000;

/// Policy inputs for turning a mission into a per-cycle frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePolicy {
    pub eta: EtaPolicy,
    pub urgency_window: Duration,
}

impl FramePolicy {
    pub fn new(assumed_speed_kmh: f64, urgency_window_hours: i64) -> Self {
        Self {
            eta: EtaPolicy::new(assumed_speed_kmh),
            urgency_window: Duration::hours(urgency_window_hours.clamp(0, MAX_URGENCY_WINDOW_HOURS)),
        }
    }

    pub fn is_urgent(&self, mission: &Mission, now: DateTime<Utc>) -> bool {
        is_urgent(mission.expires_at, now, self.urgency_window)
    }
}

impl Default for FramePolicy {
    fn default() -> Self {
        Self {
            eta: EtaPolicy::default(),
            urgency_window: Duration::hours(DEFAULT_URGENCY_WINDOW_HOURS),
        }
    }
}

/// Display state of one actively tracked mission for a single poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingFrame {
    pub mission_id: MissionId,
    pub live_position: GeoPoint,
    pub target_point: GeoPoint,
    pub target_kind: TargetKind,
    pub phase: Phase,
    pub phase_label: String,
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub is_urgent: bool,
}

impl TrackingFrame {
    /// `None` for missions that are not reporting a live position.
    pub fn compute(mission: &Mission, policy: &FramePolicy, now: DateTime<Utc>) -> Option<Self> {
        let live_position = mission.live_position?;
        let target = resolve(mission)?;
        let distance = distance_km(&live_position, &target.point);

        Some(Self {
            mission_id: mission.id.clone(),
            live_position,
            target_point: target.point,
            target_kind: target.kind(),
            phase: target.phase,
            phase_label: target.label().to_string(),
            distance_km: distance,
            eta_minutes: policy.eta.eta_minutes(distance),
            is_urgent: policy.is_urgent(mission, now),
        })
    }

    pub fn summary(&self) -> TrackingSummary {
        TrackingSummary {
            mission_id: self.mission_id.clone(),
            distance_km: round_to_tenth(self.distance_km),
            eta_minutes: self.eta_minutes,
            phase_label: self.phase_label.clone(),
        }
    }
}

/// The distance/ETA figures shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSummary {
    pub mission_id: MissionId,
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub phase_label: String,
}

impl TrackingSummary {
    pub fn distance_text(&self) -> String {
        format!("{:.1} km", self.distance_km)
    }

    pub fn eta_text(&self) -> String {
        format!("~{} min", self.eta_minutes)
    }
}
