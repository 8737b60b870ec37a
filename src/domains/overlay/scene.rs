use super::keys::{OverlayKey, OverlayRole};
use super::variant::{MarkerAppearance, MarkerLabel, MarkerVariant, PathStyle};
use crate::domains::tracking::{FramePolicy, GeoPoint, Mission, TrackingFrame};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Geometry plus styling of one desired map object.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Marker {
        point: GeoPoint,
        appearance: MarkerAppearance,
    },
    Path {
        points: [GeoPoint; 2],
        style: PathStyle,
    },
}

impl OverlayShape {
    /// Styling is compared exactly; positions within `epsilon_deg` count as unchanged.
    pub fn matches(&self, other: &OverlayShape, epsilon_deg: f64) -> bool {
        match (self, other) {
            (
                OverlayShape::Marker { point: a, appearance: sa },
                OverlayShape::Marker { point: b, appearance: sb },
            ) => sa == sb && a.approx_eq(b, epsilon_deg),
            (OverlayShape::Path { points: a, style: sa }, OverlayShape::Path { points: b, style: sb }) => {
                sa == sb && a[0].approx_eq(&b[0], epsilon_deg) && a[1].approx_eq(&b[1], epsilon_deg)
            }
            _ => false,
        }
    }

    /// Marker position, or the moving end of a path.
    pub fn anchor(&self) -> GeoPoint {
        match self {
            OverlayShape::Marker { point, .. } => *point,
            OverlayShape::Path { points, .. } => points[0],
        }
    }
}

/// One non-terminal mission as seen in the current cycle.
#[derive(Debug, Clone)]
pub struct SceneMission {
    pub mission: Mission,
    pub frame: Option<TrackingFrame>,
    pub is_urgent: bool,
}

/// Everything the reconciler should draw this cycle.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub missions: Vec<SceneMission>,
    pub viewer: Option<GeoPoint>,
}

impl Scene {
    /// Terminal missions are left out, which removes their overlay.
    pub fn build(missions: &[Mission], policy: &FramePolicy, now: DateTime<Utc>, viewer: Option<GeoPoint>) -> Self {
        let missions = missions
            .iter()
            .filter(|m| !m.status.is_terminal())
            .map(|m| SceneMission {
                mission: m.clone(),
                frame: TrackingFrame::compute(m, policy, now),
                is_urgent: policy.is_urgent(m, now),
            })
            .collect();
        Self { missions, viewer }
    }

    pub fn frames(&self) -> impl Iterator<Item = &TrackingFrame> {
        self.missions.iter().filter_map(|m| m.frame.as_ref())
    }

    /// The desired key set with the shape each key should have.
    pub fn desired(&self) -> BTreeMap<OverlayKey, OverlayShape> {
        let mut desired = BTreeMap::new();

        if let Some(viewer) = self.viewer {
            if let Some(variant) = MarkerVariant::select(false, Default::default(), OverlayRole::UserMarker) {
                desired.insert(
                    OverlayKey::Viewer,
                    OverlayShape::Marker {
                        point: viewer,
                        appearance: MarkerAppearance {
                            variant,
                            label: MarkerLabel::titled("You are here"),
                        },
                    },
                );
            }
        }

        for entry in &self.missions {
            let mission = &entry.mission;
            let marker = |role: OverlayRole, point: GeoPoint, label: MarkerLabel| {
                MarkerVariant::select(entry.is_urgent, mission.food_category, role).map(|variant| {
                    OverlayShape::Marker {
                        point,
                        appearance: MarkerAppearance { variant, label },
                    }
                })
            };

            if let Some(shape) = marker(OverlayRole::PickupMarker, mission.pickup, pickup_label(entry)) {
                desired.insert(OverlayKey::pickup(&mission.id), shape);
            }

            if let Some(dropoff) = mission.dropoff {
                if let Some(shape) = marker(OverlayRole::DropoffMarker, dropoff, dropoff_label(mission)) {
                    desired.insert(OverlayKey::dropoff(&mission.id), shape);
                }
            }

            if let Some(frame) = &entry.frame {
                if let Some(shape) = marker(OverlayRole::LiveMarker, frame.live_position, live_label(mission, frame)) {
                    desired.insert(OverlayKey::live(&mission.id), shape);
                }
                desired.insert(
                    OverlayKey::path(&mission.id),
                    OverlayShape::Path {
                        points: [frame.live_position, frame.target_point],
                        style: PathStyle::live_route(),
                    },
                );
            }
        }

        desired
    }
}

fn pickup_label(entry: &SceneMission) -> MarkerLabel {
    let mission = &entry.mission;
    let title = mission
        .food_name
        .clone()
        .or_else(|| mission.donor_name.clone())
        .unwrap_or_else(|| "Pickup".to_string());
    let label = MarkerLabel::titled(title).subtitle(if entry.is_urgent { "Urgent" } else { "Available" });
    match &mission.donor_name {
        Some(donor) if mission.food_name.is_some() => label.detail(donor.clone()),
        _ => label,
    }
}

fn dropoff_label(mission: &Mission) -> MarkerLabel {
    MarkerLabel::titled(mission.requester_name.clone().unwrap_or_else(|| "Requester".to_string())).subtitle("Dropoff")
}

fn live_label(mission: &Mission, frame: &TrackingFrame) -> MarkerLabel {
    let summary = frame.summary();
    MarkerLabel::titled(mission.volunteer_name.clone().unwrap_or_else(|| "Volunteer".to_string()))
        .subtitle(frame.phase_label.clone())
        .detail(format!("{} · {}", summary.distance_text(), summary.eta_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tracking::MissionStatus;
    use chrono::Duration;

    fn p(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[test]
    fn open_mission_contributes_endpoints_only() {
        let now = Utc::now();
        let m = Mission::new("m-1", p(20.0, 78.0), MissionStatus::Open, now + Duration::hours(30))
            .with_dropoff(p(20.1, 78.1));
        let scene = Scene::build(&[m], &FramePolicy::default(), now, None);
        let keys: Vec<_> = scene.desired().into_keys().map(|k| k.role()).collect();
        assert_eq!(keys, vec![OverlayRole::PickupMarker, OverlayRole::DropoffMarker]);
    }

    #[test]
    fn tracked_mission_adds_live_marker_and_path() {
        let now = Utc::now();
        let m = Mission::new("m-1", p(20.0, 78.0), MissionStatus::InTransit, now + Duration::hours(30))
            .with_dropoff(p(20.1, 78.1))
            .with_live_position(p(20.05, 78.05));
        let scene = Scene::build(&[m.clone()], &FramePolicy::default(), now, Some(p(20.2, 78.2)));
        let desired = scene.desired();
        assert_eq!(desired.len(), 5);

        match desired.get(&OverlayKey::path(&m.id)) {
            Some(OverlayShape::Path { points, .. }) => assert_eq!(points[1], p(20.1, 78.1)),
            other => panic!("expected path, got {:?}", other),
        }
        match desired.get(&OverlayKey::live(&m.id)) {
            Some(OverlayShape::Marker { appearance, .. }) => {
                assert_eq!(appearance.label.subtitle.as_deref(), Some("Delivering Order"));
                assert_eq!(appearance.label.detail.as_deref(), Some("7.6 km · ~23 min"));
            }
            other => panic!("expected live marker, got {:?}", other),
        }
    }

    #[test]
    fn terminal_missions_are_excluded() {
        let now = Utc::now();
        let done = Mission::new("m-1", p(20.0, 78.0), MissionStatus::Completed, now);
        let cancelled = Mission::new("m-2", p(20.0, 78.0), MissionStatus::Cancelled, now);
        let scene = Scene::build(&[done, cancelled], &FramePolicy::default(), now, None);
        assert!(scene.desired().is_empty());
    }

    #[test]
    fn shape_matching_uses_epsilon() {
        let appearance = MarkerAppearance {
            variant: MarkerVariant::select(false, Default::default(), OverlayRole::DropoffMarker).unwrap(),
            label: MarkerLabel::titled("x"),
        };
        let a = OverlayShape::Marker { point: p(20.0, 78.0), appearance: appearance.clone() };
        let b = OverlayShape::Marker { point: p(20.0 + 1e-9, 78.0), appearance: appearance.clone() };
        let c = OverlayShape::Marker { point: p(20.001, 78.0), appearance };
        assert!(a.matches(&b, 1e-7));
        assert!(!a.matches(&c, 1e-7));
    }
}
