use crate::common::{DomainResult, TrackingError};
use crate::domains::tracking::{MissionId, MissionReadSource, MissionRecord, MissionStatus};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory read source. Records can be changed while a feed is polling it,
/// and it can be told to fail to exercise retry paths.
#[derive(Default)]
pub struct InMemoryMissionSource {
    records: RwLock<Vec<MissionRecord>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryMissionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<MissionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Inserts the record, replacing any existing one with the same id.
    pub async fn upsert(&self, record: MissionRecord) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub async fn remove(&self, id: &MissionId) -> bool {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id.as_str());
        records.len() != before
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of reads served or refused so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> DomainResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TrackingError::feed_unavailable("in-memory source set to fail"));
        }
        Ok(())
    }
}

#[async_trait]
impl MissionReadSource for InMemoryMissionSource {
    async fn list_active_missions(&self) -> DomainResult<Vec<MissionRecord>> {
        self.check()?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| {
                r.status
                    .parse::<MissionStatus>()
                    .map(|s| !s.is_terminal())
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn get_mission(&self, id: &MissionId) -> DomainResult<Option<MissionRecord>> {
        self.check()?;
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id.as_str()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let source = InMemoryMissionSource::new();
        source.upsert(MissionRecord::new("a", "OPEN", Utc::now())).await;
        source.upsert(MissionRecord::new("a", "IN_TRANSIT", Utc::now())).await;

        let found = source.get_mission(&MissionId::new("a")).await.unwrap().unwrap();
        assert_eq!(found.status, "IN_TRANSIT");
        assert_eq!(source.list_active_missions().await.unwrap().len(), 1);
        assert!(source.remove(&MissionId::new("a")).await);
        assert!(source.list_active_missions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_source_refuses_reads() {
        let source = InMemoryMissionSource::new();
        source.set_failing(true);
        assert!(source.list_active_missions().await.is_err());
        source.set_failing(false);
        assert!(source.list_active_missions().await.is_ok());
        assert_eq!(source.calls(), 2);
    }
}
