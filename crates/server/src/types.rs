use crate::errors::LeagueError;
use pigskin_core::{GameMode, LeagueId};
use serde::{Deserialize, Serialize};

/// Configuration for the sync server.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Delay between ticks of the sync loop.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Stop the sync loop after this many ticks. `None` runs until shutdown.
    #[serde(default)]
    pub max_ticks: Option<u64>,
    /// Maximum number of leagues processed at once within a tick.
    #[serde(default = "default_league_concurrency")]
    pub league_concurrency: usize,
    /// Seed for hand dealing. `None` draws one from OS entropy at start-up.
    #[serde(default)]
    pub season_seed: Option<u64>,
    /// Only leagues playing this mode are synced.
    #[serde(default = "default_game_mode")]
    pub game_mode: GameMode,
}

fn default_tick_interval_ms() -> u64 {
    14_000
}

fn default_league_concurrency() -> usize {
    8
}

fn default_game_mode() -> GameMode {
    GameMode::Pigskin
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: None,
            league_concurrency: default_league_concurrency(),
            season_seed: None,
            game_mode: default_game_mode(),
        }
    }
}

/// What one tick did to one league.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeagueOutcome {
    /// No unprocessed plays.
    UpToDate,
    /// Plays `from..=to` were applied and committed.
    Advanced {
        from: usize,
        to: usize,
        plays: usize,
        rotations: usize,
        cursor_reset: bool,
    },
    /// The log shrank below the cursor and is now empty; only the rewind was committed.
    CursorReset,
    /// The league has no members and was skipped.
    EmptyQueue,
    CommitFailed(String),
    Aborted(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeagueReport {
    pub league: LeagueId,
    pub outcome: LeagueOutcome,
    pub malformed_plays: usize,
    pub fallback_deals: usize,
}

impl LeagueReport {
    pub fn new(league: LeagueId, outcome: LeagueOutcome) -> Self {
        Self {
            league,
            outcome,
            malformed_plays: 0,
            fallback_deals: 0,
        }
    }

    pub fn failed(league: LeagueId, err: &LeagueError) -> Self {
        let outcome = match err {
            LeagueError::StoreCommitFailure(e) => LeagueOutcome::CommitFailed(e.to_string()),
            LeagueError::Engine(e) => LeagueOutcome::Aborted(e.to_string()),
        };
        Self::new(league, outcome)
    }

    /// Number of plays committed for this league.
    pub fn plays_applied(&self) -> usize {
        match self.outcome {
            LeagueOutcome::Advanced { plays, .. } => plays,
            _ => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.outcome,
            LeagueOutcome::CommitFailed(_) | LeagueOutcome::Aborted(_)
        )
    }
}

/// Summary of one pass over every active league.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub log_len: usize,
    /// Ordered by league id.
    pub leagues: Vec<LeagueReport>,
}

impl TickReport {
    pub fn league(&self, id: &str) -> Option<&LeagueReport> {
        self.leagues.iter().find(|r| r.league == id)
    }

    pub fn plays_applied(&self) -> usize {
        self.leagues.iter().map(LeagueReport::plays_applied).sum()
    }

    pub fn failures(&self) -> usize {
        self.leagues.iter().filter(|r| r.is_failure()).count()
    }
}
