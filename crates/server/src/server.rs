use crate::driver::{needs_sync, sync_league, TickSnapshot};
use crate::errors::{AdminError, TickError};
use crate::store::{LeagueStore, PlayFeed};
use crate::types::{LeagueOutcome, LeagueReport, ServerConfig, TickReport};
use futures::stream::{self, StreamExt, TryStreamExt};
use pigskin_core::{shuffle_seed, ActivityLogEntry, GameConfig, InjurySet, League, Member};
use pigskin_host::{DealContext, LeagueHost};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn, Span};

/// Drives every active league forward from the shared play log.
///
/// Ticks and commissioner operations are serialised by one guard, so this
/// is the only writer of league state.
pub struct SyncServer<S: ?Sized, F: ?Sized> {
    pub config: ServerConfig,
    game: GameConfig,
    store: Arc<S>,
    feed: Arc<F>,
    season_seed: u64,
    ticks: AtomicU64,
    tick_guard: Mutex<()>,
}

impl<S, F> SyncServer<S, F>
where
    S: LeagueStore + ?Sized,
    F: PlayFeed + ?Sized,
{
    pub fn new(config: ServerConfig, game: GameConfig, store: Arc<S>, feed: Arc<F>) -> Self {
        let season_seed = config.season_seed.unwrap_or_else(rand::random);
        info!(game = %game.game_id, season_seed, "sync server created");
        Self {
            config,
            game,
            store,
            feed,
            season_seed,
            ticks: AtomicU64::new(0),
            tick_guard: Mutex::new(()),
        }
    }

    pub fn game(&self) -> &GameConfig {
        &self.game
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn season_seed(&self) -> u64 {
        self.season_seed
    }

    /// Ticks started so far, including aborted ones.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Run one pass over every active league.
    ///
    /// The feed and injury set are read once and shared by all leagues. The
    /// members of every league with work pending are read next. A failure
    /// of any of these reads aborts the tick before any league commits.
    #[tracing::instrument(skip_all, fields(tick = tracing::field::Empty))]
    pub async fn run_tick(&self) -> Result<TickReport, TickError> {
        let _guard = self.tick_guard.lock().await;
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        Span::current().record("tick", tick);

        let (feed, injuries, leagues) = tokio::join!(
            self.feed.snapshot(),
            self.store.injuries(),
            self.store.leagues()
        );
        let feed = feed.map_err(|e| {
            error!(tick, error = %e, "tick aborted, play feed unavailable");
            TickError::FeedUnavailable(e)
        })?;
        let (injuries, leagues) = match (injuries, leagues) {
            (Ok(injuries), Ok(leagues)) => (injuries, leagues),
            (Err(e), _) | (_, Err(e)) => {
                error!(tick, error = %e, "tick aborted, store read failed");
                return Err(TickError::StoreReadFailure(e));
            }
        };

        if !feed.game_id.is_empty() && feed.game_id != self.game.game_id {
            warn!(feed = %feed.game_id, configured = %self.game.game_id, "feed is for a different game");
        }

        let snapshot = TickSnapshot {
            log: feed.play_log(),
            injuries,
        };
        let active: Vec<League> = leagues
            .into_iter()
            .filter(|league| league.game_mode == self.config.game_mode)
            .collect();
        info!(tick, log_len = snapshot.log.len(), leagues = active.len(), "tick started");

        let concurrency = self.config.league_concurrency.max(1);
        let mut reports = Vec::with_capacity(active.len());
        let mut pending = Vec::new();
        for league in active {
            if needs_sync(&league, snapshot.log.len()) {
                pending.push(league);
            } else {
                reports.push(LeagueReport::new(league.id, LeagueOutcome::UpToDate));
            }
        }

        let reads: Vec<_> = pending
            .iter()
            .map(|league| self.store.members(&league.id))
            .collect();
        let rosters: Vec<Vec<Member>> = stream::iter(reads)
            .buffered(concurrency)
            .try_collect()
            .await
            .map_err(|e| {
                error!(tick, error = %e, "tick aborted, member read failed");
                TickError::StoreReadFailure(e)
            })?;

        let jobs: Vec<_> = pending
            .into_iter()
            .zip(rosters)
            .map(|(league, members)| self.sync_one(league, members, &snapshot))
            .collect();
        let synced: Vec<LeagueReport> = stream::iter(jobs)
            .buffer_unordered(concurrency)
            .collect()
            .await;
        reports.extend(synced);
        reports.sort_by(|a, b| a.league.cmp(&b.league));

        let report = TickReport {
            tick,
            log_len: snapshot.log.len(),
            leagues: reports,
        };
        info!(
            tick,
            game = %feed.game_id,
            home = feed.home_score,
            away = feed.away_score,
            plays = report.plays_applied(),
            failures = report.failures(),
            "tick finished"
        );
        Ok(report)
    }

    async fn sync_one(&self, league: League, members: Vec<Member>, snapshot: &TickSnapshot) -> LeagueReport {
        let id = league.id.clone();
        match sync_league(&*self.store, league, members, snapshot, &self.game, self.season_seed).await {
            Ok(report) => report,
            Err(e) => {
                warn!(league = %id, error = %e, "league sync failed, retrying next tick");
                LeagueReport::failed(id, &e)
            }
        }
    }

    fn deal_context<'a>(&'a self, injuries: &'a InjurySet) -> DealContext<'a> {
        DealContext {
            tiers: &self.game.tiers,
            injuries,
            roster: &self.game.roster,
            season_seed: self.season_seed,
        }
    }

    /// Shuffle the queue and deal the holder and on-deck member fresh hands.
    ///
    /// Returns the members in their new order.
    pub async fn shuffle_league(&self, id: &str) -> Result<Vec<Member>, AdminError> {
        let _guard = self.tick_guard.lock().await;
        let league = self.store.league(id).await?;
        let members = self.store.members(id).await?;
        let injuries = self.store.injuries().await?;

        let seed = shuffle_seed(self.season_seed, &league.id, league.hands_dealt);
        let mut host = LeagueHost::load(league, members, self.deal_context(&injuries))?;
        host.shuffle_and_deal(&mut ChaCha8Rng::seed_from_u64(seed));

        let commit = host.into_commit();
        let members = commit.members.clone();
        self.store.commit(commit).await?;
        info!(league = %id, members = members.len(), "queue shuffled and dealt");
        Ok(members)
    }

    /// Zero scores, clear hands and the activity log, rewind the cursor.
    pub async fn reset_league(&self, id: &str) -> Result<(), AdminError> {
        let _guard = self.tick_guard.lock().await;
        let league = self.store.league(id).await?;
        let members = self.store.members(id).await?;
        let injuries = InjurySet::new();

        let mut host = LeagueHost::load(league, members, self.deal_context(&injuries))?;
        host.reset();
        self.store.commit(host.into_commit()).await?;
        info!(league = %id, "league reset");
        Ok(())
    }

    /// Members by score, highest first; ties keep queue order.
    pub async fn standings(&self, id: &str) -> Result<Vec<Member>, AdminError> {
        let mut members = self.store.members(id).await?;
        members.sort_by(|a, b| {
            b.score_total
                .cmp(&a.score_total)
                .then(a.queue_order.cmp(&b.queue_order))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(members)
    }

    pub async fn activity_log(&self, id: &str) -> Result<Vec<ActivityLogEntry>, AdminError> {
        let mut entries = self.store.activity_log(id).await?;
        entries.sort_by_key(|entry| entry.play_index);
        Ok(entries)
    }
}
