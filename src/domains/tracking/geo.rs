use crate::common::{DomainResult, TrackingError};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average city delivery speed used for ETA estimates.
pub const DEFAULT_ASSUMED_SPEED_KMH: f64 = 20.0;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> DomainResult<Self> {
        if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(TrackingError::InvalidCoordinate { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    /// True when both axes differ by no more than `epsilon_deg`.
    pub fn approx_eq(&self, other: &GeoPoint, epsilon_deg: f64) -> bool {
        (self.lat - other.lat).abs() <= epsilon_deg && (self.lng - other.lng).abs() <= epsilon_deg
    }
}

/// Great-circle distance between two points using the haversine formula.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Rounds a distance to one decimal place for display.
pub fn round_to_tenth(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

/// Converts a distance into a whole-minute travel estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EtaPolicy {
    pub assumed_speed_kmh: f64,
}

impl EtaPolicy {
    pub fn new(assumed_speed_kmh: f64) -> Self {
        if assumed_speed_kmh.is_finite() && assumed_speed_kmh > 0.0 {
            Self { assumed_speed_kmh }
        } else {
            Self::default()
        }
    }

    pub fn eta_minutes(&self, distance_km: f64) -> u32 {
        if !distance_km.is_finite() || distance_km <= 0.0 {
            return 0;
        }
        let minutes = (distance_km / self.assumed_speed_kmh * 60.0).ceil();
        if minutes >= u32::MAX as f64 {
            u32::MAX
        } else {
            minutes as u32
        }
    }
}

impl Default for EtaPolicy {
    fn default() -> Self {
        Self {
            assumed_speed_kmh: DEFAULT_ASSUMED_SPEED_KMH,
        }
    }
}

/// ETA at the default city delivery speed.
pub fn eta_minutes(distance_km: f64) -> u32 {
    EtaPolicy::default().eta_minutes(distance_km)
}
