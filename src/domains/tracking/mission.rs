use super::geo::GeoPoint;
use crate::common::{DomainResult, TrackingError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Postings whose food expires within this window are flagged urgent.
pub const DEFAULT_URGENCY_WINDOW_HOURS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(String);

impl MissionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MissionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Open,
    PickupVerificationPending,
    InTransit,
    DeliveryVerificationPending,
    Completed,
    Cancelled,
}

impl MissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Cancelled)
    }

    /// Statuses during which a volunteer is expected to report a position.
    pub fn reports_live_position(&self) -> bool {
        matches!(
            self,
            MissionStatus::InTransit
                | MissionStatus::PickupVerificationPending
                | MissionStatus::DeliveryVerificationPending
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Open => "OPEN",
            MissionStatus::PickupVerificationPending => "PICKUP_VERIFICATION_PENDING",
            MissionStatus::InTransit => "IN_TRANSIT",
            MissionStatus::DeliveryVerificationPending => "DELIVERY_VERIFICATION_PENDING",
            MissionStatus::Completed => "COMPLETED",
            MissionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for MissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        match normalized.as_str() {
            "OPEN" | "AVAILABLE" => Ok(MissionStatus::Open),
            "PICKUP_VERIFICATION_PENDING" => Ok(MissionStatus::PickupVerificationPending),
            "IN_TRANSIT" => Ok(MissionStatus::InTransit),
            "DELIVERY_VERIFICATION_PENDING" => Ok(MissionStatus::DeliveryVerificationPending),
            "COMPLETED" | "DELIVERED" => Ok(MissionStatus::Completed),
            "CANCELLED" | "CANCELED" => Ok(MissionStatus::Cancelled),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FoodCategory {
    Veg,
    NonVeg,
    #[default]
    Other,
}

impl FoodCategory {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "veg" || s == "vegetarian" => FoodCategory::Veg,
            Some(s) if s == "non-veg" || s == "nonveg" || s == "non_veg" => FoodCategory::NonVeg,
            _ => FoodCategory::Other,
        }
    }
}

/// One tracked delivery from pickup to dropoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub pickup: GeoPoint,
    pub dropoff: Option<GeoPoint>,
    pub live_position: Option<GeoPoint>,
    pub status: MissionStatus,
    pub expires_at: DateTime<Utc>,
    pub food_category: FoodCategory,
    pub food_name: Option<String>,
    pub donor_name: Option<String>,
    pub requester_name: Option<String>,
    pub volunteer_name: Option<String>,
}

impl Mission {
    pub fn new(id: impl Into<String>, pickup: GeoPoint, status: MissionStatus, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: MissionId::new(id),
            pickup,
            dropoff: None,
            live_position: None,
            status,
            expires_at,
            food_category: FoodCategory::Other,
            food_name: None,
            donor_name: None,
            requester_name: None,
            volunteer_name: None,
        }
    }

    pub fn with_dropoff(mut self, dropoff: GeoPoint) -> Self {
        self.dropoff = Some(dropoff);
        self
    }

    /// Sets the live position; ignored unless the status allows one.
    pub fn with_live_position(mut self, position: GeoPoint) -> Self {
        if self.status.reports_live_position() {
            self.live_position = Some(position);
        }
        self
    }

    pub fn with_category(mut self, category: FoodCategory) -> Self {
        self.food_category = category;
        self
    }

    pub fn with_volunteer(mut self, name: impl Into<String>) -> Self {
        self.volunteer_name = Some(name.into());
        self
    }

    pub fn is_urgent(&self, now: DateTime<Utc>) -> bool {
        is_urgent(self.expires_at, now, Duration::hours(DEFAULT_URGENCY_WINDOW_HOURS))
    }
}

/// `expires_at - now < window`. Already-expired items are urgent.
pub fn is_urgent(expires_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    expires_at - now < window
}

/// Latitude/longitude pair as stored by the posting backend; either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl RawLocation {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
        }
    }

    fn to_point(&self) -> Option<DomainResult<GeoPoint>> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }
}

/// Loosely typed mission row returned by a read source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionRecord {
    pub id: String,
    pub status: String,
    #[serde(default, alias = "location")]
    pub pickup: Option<RawLocation>,
    #[serde(default, alias = "requesterAddress")]
    pub dropoff: Option<RawLocation>,
    #[serde(default, alias = "volunteerLocation")]
    pub live_position: Option<RawLocation>,
    #[serde(alias = "expiryDate")]
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub food_category: Option<String>,
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default, alias = "orphanageName")]
    pub requester_name: Option<String>,
    #[serde(default)]
    pub volunteer_name: Option<String>,
}

impl MissionRecord {
    pub fn new(id: impl Into<String>, status: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            pickup: None,
            dropoff: None,
            live_position: None,
            expires_at,
            food_category: None,
            food_name: None,
            donor_name: None,
            requester_name: None,
            volunteer_name: None,
        }
    }
}

impl TryFrom<MissionRecord> for Mission {
    type Error = TrackingError;

    /// Pickup is mandatory; a bad dropoff or live coordinate is treated as absent.
    fn try_from(record: MissionRecord) -> Result<Self, Self::Error> {
        let status = record
            .status
            .parse::<MissionStatus>()
            .map_err(|status| TrackingError::UnknownStatus {
                mission_id: record.id.clone(),
                status,
            })?;

        let pickup = match record.pickup.as_ref().and_then(RawLocation::to_point) {
            Some(point) => point?,
            None => {
                return Err(TrackingError::MissingCoordinate {
                    mission_id: record.id,
                    field: "pickup",
                })
            }
        };

        let dropoff = record
            .dropoff
            .as_ref()
            .and_then(RawLocation::to_point)
            .and_then(Result::ok);

        let live_position = if status.reports_live_position() {
            record
                .live_position
                .as_ref()
                .and_then(RawLocation::to_point)
                .and_then(Result::ok)
        } else {
            None
        };

        Ok(Mission {
            id: MissionId::new(record.id),
            pickup,
            dropoff,
            live_position,
            status,
            expires_at: record.expires_at,
            food_category: FoodCategory::parse(record.food_category.as_deref()),
            food_name: record.food_name,
            donor_name: record.donor_name,
            requester_name: record.requester_name,
            volunteer_name: record.volunteer_name,
        })
    }
}
