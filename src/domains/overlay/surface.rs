use super::keys::OverlayKey;
use super::variant::{MarkerAppearance, PathStyle};
use crate::domains::tracking::{GeoPoint, MissionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque reference to an object living on a map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapHandle(Uuid);

impl MapHandle {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rendering boundary the reconciler drives.
///
/// Calls are synchronous: the effect of one call is observable before the next
/// is issued. Handles passed back in were always returned by the same surface.
pub trait MapSurface: Send + 'static {
    fn add_marker(&mut self, key: &OverlayKey, point: GeoPoint, appearance: &MarkerAppearance) -> MapHandle;
    fn update_marker(&mut self, handle: MapHandle, point: GeoPoint, appearance: &MarkerAppearance);
    fn remove_marker(&mut self, handle: MapHandle);

    fn add_path(&mut self, key: &OverlayKey, points: [GeoPoint; 2], style: &PathStyle) -> MapHandle;
    fn update_path(&mut self, handle: MapHandle, points: [GeoPoint; 2], style: &PathStyle);
    fn remove_path(&mut self, handle: MapHandle);

    fn pan_to(&mut self, point: GeoPoint);
    fn set_center(&mut self, point: GeoPoint, zoom: u8);

    /// End of a reconciliation pass.
    fn commit(&mut self) {}
}

/// Receives "user selected this mission's marker" from a map adapter.
pub trait SelectionListener: Send + Sync {
    fn on_mission_selected(&self, mission_id: &MissionId);
}

impl<F> SelectionListener for F
where
    F: Fn(&MissionId) + Send + Sync,
{
    fn on_mission_selected(&self, mission_id: &MissionId) {
        self(mission_id)
    }
}
