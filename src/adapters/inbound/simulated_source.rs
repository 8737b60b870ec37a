use crate::common::DomainResult;
use crate::domains::tracking::{
    distance_km, resolve, GeoPoint, Mission, MissionId, MissionReadSource, MissionRecord, MissionStatus, RawLocation,
};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;

/// Distance a simulated volunteer covers per poll: about 20 km/h at a 2 s interval.
pub const DEFAULT_STEP_KM: f64 = 0.011;

/// GPS noise added to each reported position, in degrees.
pub const DEFAULT_JITTER_DEG: f64 = 0.00002;

/// Read source whose in-transit volunteers drive toward their target on every
/// `list_active_missions` call. On arrival the mission moves to delivery
/// verification and stops moving.
pub struct SimulatedSource {
    records: Mutex<Vec<MissionRecord>>,
    step_km: f64,
    jitter_deg: f64,
}

impl SimulatedSource {
    pub fn new(records: Vec<MissionRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            step_km: DEFAULT_STEP_KM,
            jitter_deg: DEFAULT_JITTER_DEG,
        }
    }

    pub fn with_step(mut self, step_km: f64, jitter_deg: f64) -> Self {
        self.step_km = step_km.max(0.0);
        self.jitter_deg = jitter_deg.abs();
        self
    }

    /// Moves every travelling volunteer one step and returns the resulting records.
    fn advance(&self) -> Vec<MissionRecord> {
        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut rng = rand::thread_rng();

        for record in records.iter_mut() {
            let Ok(mission) = Mission::try_from(record.clone()) else {
                continue;
            };
            if mission.status != MissionStatus::InTransit {
                continue;
            }
            let (Some(from), Some(target)) = (mission.live_position, resolve(&mission)) else {
                continue;
            };

            let remaining = distance_km(&from, &target.point);
            let next = if remaining <= self.step_km {
                record.status = MissionStatus::DeliveryVerificationPending.as_str().to_string();
                target.point
            } else {
                let t = self.step_km / remaining;
                let lat = from.lat + (target.point.lat - from.lat) * t;
                let lng = from.lng + (target.point.lng - from.lng) * t;
                let (dlat, dlng) = if self.jitter_deg > 0.0 {
                    (
                        rng.gen_range(-self.jitter_deg..=self.jitter_deg),
                        rng.gen_range(-self.jitter_deg..=self.jitter_deg),
                    )
                } else {
                    (0.0, 0.0)
                };
                GeoPoint::new(lat + dlat, lng + dlng).unwrap_or(from)
            };
            record.live_position = Some(RawLocation::at(next.lat, next.lng));
        }

        records.clone()
    }

    /// A small demo fleet around Nagpur.
    pub fn demo_fleet(now: chrono::DateTime<chrono::Utc>) -> Vec<MissionRecord> {
        let mut delivering = MissionRecord::new("demo-transit", "IN_TRANSIT", now + chrono::Duration::hours(10));
        delivering.pickup = Some(RawLocation::at(21.1458, 79.0882));
        delivering.dropoff = Some(RawLocation::at(21.1702, 79.0950));
        delivering.live_position = Some(RawLocation::at(21.1500, 79.0890));
        delivering.food_category = Some("veg".to_string());
        delivering.food_name = Some("Vegetable biryani".to_string());
        delivering.donor_name = Some("Hotel Annapurna".to_string());
        delivering.requester_name = Some("Sneh Orphanage".to_string());
        delivering.volunteer_name = Some("Ravi".to_string());

        let mut verifying = MissionRecord::new("demo-verify", "PICKUP_VERIFICATION_PENDING", now + chrono::Duration::hours(30));
        verifying.pickup = Some(RawLocation::at(21.1300, 79.0600));
        verifying.dropoff = Some(RawLocation::at(21.1000, 79.0500));
        verifying.live_position = Some(RawLocation::at(21.1301, 79.0601));
        verifying.food_category = Some("non-veg".to_string());
        verifying.food_name = Some("Chicken curry".to_string());
        verifying.volunteer_name = Some("Asha".to_string());

        let mut waiting = MissionRecord::new("demo-open", "OPEN", now + chrono::Duration::hours(4));
        waiting.pickup = Some(RawLocation::at(21.1600, 79.0700));
        waiting.food_name = Some("Bread".to_string());
        waiting.donor_name = Some("City Bakery".to_string());

        vec![delivering, verifying, waiting]
    }
}

#[async_trait]
impl MissionReadSource for SimulatedSource {
    async fn list_active_missions(&self) -> DomainResult<Vec<MissionRecord>> {
        Ok(self
            .advance()
            .into_iter()
            .filter(|r| {
                r.status
                    .parse::<MissionStatus>()
                    .map(|s| !s.is_terminal())
                    .unwrap_or(true)
            })
            .collect())
    }

    async fn get_mission(&self, id: &MissionId) -> DomainResult<Option<MissionRecord>> {
        Ok(self.advance().into_iter().find(|r| r.id == id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn live_point(record: &MissionRecord) -> GeoPoint {
        let loc = record.live_position.as_ref().unwrap();
        GeoPoint::new(loc.lat.unwrap(), loc.lng.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn volunteer_closes_in_on_dropoff() {
        let fleet = SimulatedSource::demo_fleet(Utc::now());
        let dropoff = GeoPoint::new(21.1702, 79.0950).unwrap();
        let start = distance_km(&live_point(&fleet[0]), &dropoff);

        let source = SimulatedSource::new(fleet).with_step(0.5, 0.0);
        let id = MissionId::new("demo-transit");
        let after = source.get_mission(&id).await.unwrap().unwrap();

        let now_km = distance_km(&live_point(&after), &dropoff);
        assert!((start - now_km - 0.5).abs() < 0.01, "moved {}", start - now_km);
    }

    #[tokio::test]
    async fn arrival_switches_to_delivery_verification() {
        let source = SimulatedSource::new(SimulatedSource::demo_fleet(Utc::now())).with_step(100.0, 0.0);
        let id = MissionId::new("demo-transit");
        let arrived = source.get_mission(&id).await.unwrap().unwrap();
        assert_eq!(arrived.status, "DELIVERY_VERIFICATION_PENDING");
        assert_eq!(arrived.live_position, Some(RawLocation::at(21.1702, 79.0950)));

        // Verifying missions stay put.
        let verify = source.get_mission(&MissionId::new("demo-verify")).await.unwrap().unwrap();
        assert_eq!(verify.live_position, Some(RawLocation::at(21.1301, 79.0601)));
    }
}
