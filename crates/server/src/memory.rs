//! In-process store and feed, used by the runner and in tests.

use crate::errors::StoreError;
use crate::store::{LeagueStore, PlayFeed};
use async_trait::async_trait;
use chrono::Utc;
use pigskin_core::{ActivityLogEntry, InjurySet, League, LeagueId, LiveFeed, Member, Play};
use pigskin_host::LeagueCommit;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

#[derive(Clone, Debug)]
struct LeagueDoc {
    league: League,
    members: Vec<Member>,
    activity: BTreeMap<usize, ActivityLogEntry>,
}

/// League, member, activity and injury documents held in memory.
///
/// Commits land under a single write lock, so readers never observe half of
/// one. Faults can be injected to exercise retry paths.
#[derive(Default)]
pub struct MemoryStore {
    leagues: RwLock<BTreeMap<LeagueId, LeagueDoc>>,
    injuries: RwLock<InjurySet>,
    unavailable: AtomicBool,
    failing_commits: Mutex<HashMap<LeagueId, usize>>,
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a league and its members. Its activity log starts empty.
    pub async fn insert_league(&self, league: League, members: Vec<Member>) {
        let doc = LeagueDoc {
            league,
            members,
            activity: BTreeMap::new(),
        };
        self.leagues.write().await.insert(doc.league.id.clone(), doc);
    }

    pub async fn set_injuries(&self, injuries: InjurySet) {
        *self.injuries.write().await = injuries;
    }

    /// While set, every call fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Reject the next `n` commits for `league`.
    pub async fn fail_next_commits(&self, league: impl Into<LeagueId>, n: usize) {
        self.failing_commits.lock().await.insert(league.into(), n);
    }

    /// Number of commits accepted so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    async fn take_injected_failure(&self, league: &str) -> bool {
        let mut failing = self.failing_commits.lock().await;
        match failing.get_mut(league) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl LeagueStore for MemoryStore {
    async fn injuries(&self) -> Result<InjurySet, StoreError> {
        self.check_available()?;
        Ok(self.injuries.read().await.clone())
    }

    async fn leagues(&self) -> Result<Vec<League>, StoreError> {
        self.check_available()?;
        let leagues = self.leagues.read().await;
        Ok(leagues.values().map(|doc| doc.league.clone()).collect())
    }

    async fn league(&self, id: &str) -> Result<League, StoreError> {
        self.check_available()?;
        let leagues = self.leagues.read().await;
        leagues
            .get(id)
            .map(|doc| doc.league.clone())
            .ok_or_else(|| StoreError::LeagueNotFound(id.to_string()))
    }

    async fn members(&self, league: &str) -> Result<Vec<Member>, StoreError> {
        self.check_available()?;
        let leagues = self.leagues.read().await;
        leagues
            .get(league)
            .map(|doc| doc.members.clone())
            .ok_or_else(|| StoreError::LeagueNotFound(league.to_string()))
    }

    async fn commit(&self, commit: LeagueCommit) -> Result<(), StoreError> {
        self.check_available()?;
        let id = commit.league.id.clone();
        if self.take_injected_failure(&id).await {
            return Err(StoreError::CommitRejected {
                league: id,
                reason: "injected failure".into(),
            });
        }

        let mut leagues = self.leagues.write().await;
        let doc = leagues
            .get_mut(&id)
            .ok_or_else(|| StoreError::LeagueNotFound(id.clone()))?;

        if commit.clear_activity {
            doc.activity.clear();
        }
        let now = Utc::now();
        for mut entry in commit.activity {
            // Rewriting an identical entry keeps its first timestamp.
            entry.timestamp = match doc.activity.get(&entry.play_index) {
                Some(existing) if existing.same_content(&entry) => existing.timestamp,
                _ => Some(now),
            };
            doc.activity.insert(entry.play_index, entry);
        }
        doc.league = commit.league;
        doc.members = commit.members;

        self.commits.fetch_add(1, Ordering::Relaxed);
        debug!(league = %id, cursor = doc.league.last_play_index, "commit applied");
        Ok(())
    }

    async fn activity_log(&self, league: &str) -> Result<Vec<ActivityLogEntry>, StoreError> {
        self.check_available()?;
        let leagues = self.leagues.read().await;
        leagues
            .get(league)
            .map(|doc| doc.activity.values().cloned().collect())
            .ok_or_else(|| StoreError::LeagueNotFound(league.to_string()))
    }
}

/// A live feed document that tests and the runner can append to.
#[derive(Default)]
pub struct MemoryFeed {
    feed: RwLock<LiveFeed>,
    unavailable: AtomicBool,
}

impl MemoryFeed {
    pub fn new(feed: LiveFeed) -> Self {
        Self {
            feed: RwLock::new(feed),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn from_plays(plays: Vec<Play>) -> Self {
        Self::new(LiveFeed {
            plays,
            ..LiveFeed::default()
        })
    }

    pub async fn push(&self, play: Play) {
        self.feed.write().await.plays.push(play);
    }

    /// Swap the whole feed, as when the ingester rewrites it.
    pub async fn replace(&self, feed: LiveFeed) {
        *self.feed.write().await = feed;
    }

    pub async fn clear(&self) {
        self.feed.write().await.plays.clear();
    }

    pub async fn len(&self) -> usize {
        self.feed.read().await.plays.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }
}

#[async_trait]
impl PlayFeed for MemoryFeed {
    async fn snapshot(&self) -> Result<LiveFeed, StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("live feed offline".into()));
        }
        Ok(self.feed.read().await.clone())
    }
}
