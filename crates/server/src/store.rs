use crate::errors::StoreError;
use async_trait::async_trait;
use pigskin_core::{ActivityLogEntry, InjurySet, League, LiveFeed, Member};
use pigskin_host::LeagueCommit;

/// Read-only view of the live feed document.
#[async_trait]
pub trait PlayFeed: Send + Sync {
    /// The whole feed, re-read in full on every call.
    async fn snapshot(&self) -> Result<LiveFeed, StoreError>;
}

/// League, member and injury documents.
///
/// Reads are point-in-time snapshots. [`commit`](LeagueStore::commit) must
/// apply all of a league's mutations or none of them.
#[async_trait]
pub trait LeagueStore: Send + Sync {
    async fn injuries(&self) -> Result<InjurySet, StoreError>;

    async fn leagues(&self) -> Result<Vec<League>, StoreError>;

    async fn league(&self, id: &str) -> Result<League, StoreError>;

    async fn members(&self, league: &str) -> Result<Vec<Member>, StoreError>;

    async fn commit(&self, commit: LeagueCommit) -> Result<(), StoreError>;

    /// Entries ordered by play index.
    async fn activity_log(&self, league: &str) -> Result<Vec<ActivityLogEntry>, StoreError>;
}
