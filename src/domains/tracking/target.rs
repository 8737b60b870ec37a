use super::geo::GeoPoint;
use super::mission::{Mission, MissionStatus};
use serde::{Deserialize, Serialize};

/// Which leg of the delivery the volunteer is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    HeadingToPickup,
    VerifyingPickup,
    DeliveringOrder,
    VerifyingDelivery,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::HeadingToPickup => "Heading to Pickup",
            Phase::VerifyingPickup => "Verifying Pickup",
            Phase::DeliveringOrder => "Delivering Order",
            Phase::VerifyingDelivery => "Verifying Delivery",
        }
    }

    pub fn target_kind(&self) -> TargetKind {
        match self {
            Phase::HeadingToPickup | Phase::VerifyingPickup => TargetKind::Pickup,
            Phase::DeliveringOrder | Phase::VerifyingDelivery => TargetKind::Dropoff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub point: GeoPoint,
    pub phase: Phase,
}

impl ResolvedTarget {
    pub fn label(&self) -> &'static str {
        self.phase.label()
    }

    pub fn kind(&self) -> TargetKind {
        self.phase.target_kind()
    }
}

/// Picks the navigation target for an actively tracked mission.
///
/// Pickup verification wins over an assigned dropoff because the volunteer has
/// not left the pickup site yet. Returns `None` when nothing is reporting a
/// live position.
pub fn resolve(mission: &Mission) -> Option<ResolvedTarget> {
    mission.live_position?;

    if mission.status == MissionStatus::PickupVerificationPending {
        return Some(ResolvedTarget {
            point: mission.pickup,
            phase: Phase::VerifyingPickup,
        });
    }

    match mission.dropoff {
        Some(dropoff) => {
            let phase = if mission.status == MissionStatus::DeliveryVerificationPending {
                Phase::VerifyingDelivery
            } else {
                Phase::DeliveringOrder
            };
            Some(ResolvedTarget { point: dropoff, phase })
        }
        None => Some(ResolvedTarget {
            point: mission.pickup,
            phase: Phase::HeadingToPickup,
        }),
    }
}
