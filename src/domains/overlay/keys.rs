use crate::domains::tracking::MissionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a map object represents for its mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlayRole {
    PickupMarker,
    DropoffMarker,
    LiveMarker,
    PathLine,
    UserMarker,
}

impl OverlayRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayRole::PickupMarker => "pickup",
            OverlayRole::DropoffMarker => "dropoff",
            OverlayRole::LiveMarker => "live",
            OverlayRole::PathLine => "path",
            OverlayRole::UserMarker => "user",
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self, OverlayRole::PathLine)
    }
}

/// Stable identity of one rendered map object.
///
/// Mission keys are ordered by mission id first so a pass touches one mission's
/// objects together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlayKey {
    Mission { mission_id: MissionId, role: OverlayRole },
    Viewer,
}

impl OverlayKey {
    pub fn pickup(id: &MissionId) -> Self {
        Self::mission(id, OverlayRole::PickupMarker)
    }

    pub fn dropoff(id: &MissionId) -> Self {
        Self::mission(id, OverlayRole::DropoffMarker)
    }

    pub fn live(id: &MissionId) -> Self {
        Self::mission(id, OverlayRole::LiveMarker)
    }

    pub fn path(id: &MissionId) -> Self {
        Self::mission(id, OverlayRole::PathLine)
    }

    fn mission(id: &MissionId, role: OverlayRole) -> Self {
        OverlayKey::Mission {
            mission_id: id.clone(),
            role,
        }
    }

    pub fn role(&self) -> OverlayRole {
        match self {
            OverlayKey::Mission { role, .. } => *role,
            OverlayKey::Viewer => OverlayRole::UserMarker,
        }
    }

    pub fn mission_id(&self) -> Option<&MissionId> {
        match self {
            OverlayKey::Mission { mission_id, .. } => Some(mission_id),
            OverlayKey::Viewer => None,
        }
    }
}

impl fmt::Display for OverlayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayKey::Mission { mission_id, role } => write!(f, "{}/{}", mission_id, role.as_str()),
            OverlayKey::Viewer => f.write_str("viewer"),
        }
    }
}
