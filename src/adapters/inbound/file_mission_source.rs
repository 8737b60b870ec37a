use crate::common::{DomainResult, TrackingError};
use crate::domains::tracking::{MissionId, MissionReadSource, MissionRecord, MissionStatus};
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads missions from a JSON array of records on disk.
///
/// The file is re-read on every call so edits made by another process show up
/// on the next poll.
pub struct FileMissionSource {
    path: PathBuf,
}

impl FileMissionSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> DomainResult<Vec<MissionRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            TrackingError::feed_unavailable(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

/// Records whose status string parses as terminal are finished; anything else,
/// including statuses this build does not know, is left for the feed to judge.
fn is_active(record: &MissionRecord) -> bool {
    record
        .status
        .parse::<MissionStatus>()
        .map(|status| !status.is_terminal())
        .unwrap_or(true)
}

#[async_trait]
impl MissionReadSource for FileMissionSource {
    async fn list_active_missions(&self) -> DomainResult<Vec<MissionRecord>> {
        let records = self.read_all().await?;
        Ok(records.into_iter().filter(is_active).collect())
    }

    async fn get_mission(&self, id: &MissionId) -> DomainResult<Option<MissionRecord>> {
        let records = self.read_all().await?;
        Ok(records.into_iter().find(|r| r.id == id.as_str()))
    }
}
