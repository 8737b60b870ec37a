use super::mission::{MissionId, MissionRecord};
use crate::common::DomainResult;
use async_trait::async_trait;

/// Read-only port onto the posting store the tracker polls.
///
/// Adapters return raw records; normalisation into `Mission` happens in the feed
/// so unknown statuses and bad coordinates are handled in one place.
#[async_trait]
pub trait MissionReadSource: Send + Sync {
    /// Every mission the store currently considers active.
    async fn list_active_missions(&self) -> DomainResult<Vec<MissionRecord>>;

    async fn get_mission(&self, id: &MissionId) -> DomainResult<Option<MissionRecord>>;
}
