use crate::errors::LeagueError;
use crate::store::LeagueStore;
use crate::types::{LeagueOutcome, LeagueReport};
use pigskin_core::{GameConfig, InjurySet, League, Member, PlayLog};
use pigskin_host::{DealContext, HostError, LeagueHost};
use tracing::{debug, info, warn, Span};

/// Read-only inputs taken once at the start of a tick and shared by every league.
#[derive(Clone, Debug, Default)]
pub struct TickSnapshot {
    pub log: PlayLog,
    pub injuries: InjurySet,
}

/// Whether `league` has unapplied plays or a cursor to rewind.
pub fn needs_sync(league: &League, log_len: usize) -> bool {
    let resume = league.resume(log_len);
    resume.cursor_reset || resume.start < log_len
}

/// Bring one league up to date with the log snapshot.
///
/// `members` must be read from the store after `snapshot` was taken. Plays
/// are folded strictly in index order and committed as one unit. On any
/// error nothing is written, so the same range is retried next tick.
#[tracing::instrument(
    skip_all,
    fields(league = %league.id, cursor = league.last_play_index, from = tracing::field::Empty)
)]
pub async fn sync_league<S: LeagueStore + ?Sized>(
    store: &S,
    league: League,
    members: Vec<Member>,
    snapshot: &TickSnapshot,
    game: &GameConfig,
    season_seed: u64,
) -> Result<LeagueReport, LeagueError> {
    let log_len = snapshot.log.len();
    if !needs_sync(&league, log_len) {
        return Ok(LeagueReport::new(league.id, LeagueOutcome::UpToDate));
    }
    let resume = league.resume(log_len);
    Span::current().record("from", resume.start);

    let ctx = DealContext {
        tiers: &game.tiers,
        injuries: &snapshot.injuries,
        roster: &game.roster,
        season_seed,
    };
    let mut host = match LeagueHost::load(league, members, ctx) {
        Ok(host) => host,
        Err(HostError::EmptyQueue(id)) => {
            if resume.cursor_reset {
                debug!(
                    league = %id,
                    log_len,
                    "cursor beyond end of play log, rewind deferred until the league has members"
                );
            }
            info!(league = %id, "league has no members, skipping");
            return Ok(LeagueReport::new(id, LeagueOutcome::EmptyQueue));
        }
        Err(e) => return Err(e.into()),
    };

    if resume.cursor_reset {
        warn!(
            league = %host.league().id,
            cursor = host.league().last_play_index,
            log_len,
            "cursor beyond end of play log, reprocessing from the start"
        );
        host.rewind_cursor();
    }

    let plays = snapshot.log.plays_from(resume.start);
    for play in plays {
        host.apply_play(play)?;
    }

    let stats = host.stats();
    let id = host.league().id.clone();
    store
        .commit(host.into_commit())
        .await
        .map_err(LeagueError::StoreCommitFailure)?;

    let outcome = match plays.last() {
        Some(last) => {
            info!(league = %id, from = resume.start, to = last.index, plays = plays.len(), "league advanced");
            LeagueOutcome::Advanced {
                from: resume.start,
                to: last.index,
                plays: plays.len(),
                rotations: stats.rotations,
                cursor_reset: resume.cursor_reset,
            }
        }
        None => LeagueOutcome::CursorReset,
    };

    Ok(LeagueReport {
        league: id,
        outcome,
        malformed_plays: stats.malformed,
        fallback_deals: stats.fallback_deals,
    })
}
