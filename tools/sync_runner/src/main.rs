//! Sync runner - drives the pigskin sync loop over a JSON fixture.
//!
//! Loads leagues, members, injuries and a live feed into the in-memory store,
//! runs ticks on an interval and prints standings when done. With `--drip`
//! the feed starts empty and gains one play per tick, like a live game.

use clap::Parser;
use pigskin_core::{GameConfig, InjurySet, League, LiveFeed, Member, Play};
use pigskin_server::{
    run_sync_loop, LeagueStore, MemoryFeed, MemoryStore, PlayFeed, ServerConfig, SyncServer,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sync-runner")]
#[command(about = "Run the pigskin sync loop over a league fixture")]
struct Args {
    /// League fixture (leagues, members, injuries, feed)
    #[arg(long, default_value = "demos/fixture.json")]
    fixture: PathBuf,

    /// Server configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Game configuration (tiers and roster); defaults to the built-in game
    #[arg(long)]
    game: Option<PathBuf>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Milliseconds between ticks
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Season seed for dealing hands
    #[arg(long)]
    seed: Option<u64>,

    /// Start with an empty feed and append one play per tick
    #[arg(long)]
    drip: bool,
}

#[derive(Deserialize, Debug, Default)]
struct Fixture {
    #[serde(default)]
    leagues: Vec<LeagueFixture>,
    #[serde(default)]
    injuries: InjurySet,
    #[serde(default)]
    feed: LiveFeed,
}

#[derive(Deserialize, Debug)]
struct LeagueFixture {
    league: League,
    #[serde(default)]
    members: Vec<Member>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let value = serde_json::from_str(&text)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config: ServerConfig = match &args.config {
        Some(path) => read_json(path)?,
        None => ServerConfig::default(),
    };
    if let Some(ms) = args.interval_ms {
        config.tick_interval_ms = ms;
    }
    if let Some(seed) = args.seed {
        config.season_seed = Some(seed);
    }
    if let Some(ticks) = args.ticks {
        config.max_ticks = Some(ticks);
    }

    let game = match &args.game {
        Some(path) => GameConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => GameConfig::default(),
    };

    let fixture: Fixture = read_json(&args.fixture)?;
    let store = Arc::new(MemoryStore::new());
    let league_ids: Vec<String> = fixture.leagues.iter().map(|l| l.league.id.clone()).collect();
    for entry in fixture.leagues {
        store.insert_league(entry.league, entry.members).await;
    }
    store.set_injuries(fixture.injuries).await;

    let mut feed = fixture.feed;
    let pending: Vec<Play> = if args.drip {
        std::mem::take(&mut feed.plays)
    } else {
        Vec::new()
    };
    let feed = Arc::new(MemoryFeed::new(feed));

    tracing::info!(
        leagues = league_ids.len(),
        interval_ms = config.tick_interval_ms,
        drip = args.drip,
        "starting sync runner"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("ctrl-c received, stopping after the current tick");
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    }

    if args.drip {
        let max_ticks = config.max_ticks.unwrap_or(pending.len() as u64);
        let period = Duration::from_millis(config.tick_interval_ms.max(1));
        let server = SyncServer::new(config, game, store.clone(), feed.clone());
        run_drip(&server, &feed, pending, period, max_ticks, &shutdown).await;
    } else {
        let server = Arc::new(SyncServer::new(config, game, store.clone(), feed.clone()));
        run_sync_loop(server, shutdown).await;
    }

    print_game(&feed.snapshot().await?);
    for id in &league_ids {
        print_league(&store, id).await?;
    }
    Ok(())
}

/// Feed one pending play per tick, then tick.
async fn run_drip(
    server: &SyncServer<MemoryStore, MemoryFeed>,
    feed: &MemoryFeed,
    pending: Vec<Play>,
    period: Duration,
    max_ticks: u64,
    shutdown: &AtomicBool,
) {
    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut pending = pending.into_iter();

    for _ in 0..max_ticks {
        interval.tick().await;
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        if let Some(play) = pending.next() {
            println!("> {}", play.text_or_empty());
            feed.push(play).await;
        }
        if let Err(e) = server.run_tick().await {
            tracing::warn!(error = %e, "tick failed");
        }
    }
}

fn print_game(feed: &LiveFeed) {
    println!();
    println!(
        "{}  {}-{}  {} {}  ({} plays)",
        feed.game_id,
        feed.home_score,
        feed.away_score,
        feed.period,
        feed.clock,
        feed.plays.len()
    );
}

async fn print_league(store: &MemoryStore, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let league = store.league(id).await?;
    let mut members = store.members(id).await?;
    members.sort_by(|a, b| {
        b.score_total
            .cmp(&a.score_total)
            .then(a.queue_order.cmp(&b.queue_order))
    });

    println!();
    println!("=== {} (last play {}) ===", league.id, league.last_play_index);
    for member in &members {
        let marker = match member.queue_order {
            1 => "🏈",
            2 => "on deck",
            _ => "",
        };
        println!(
            "{:>4}  #{:<2} {:<16} {}",
            member.score_total, member.queue_order, member.username, marker
        );
    }

    let log = store.activity_log(id).await?;
    println!("--- last {} of {} log entries ---", log.len().min(5), log.len());
    for entry in log.iter().rev().take(5).rev() {
        println!("{}  {:<20} {}", entry.doc_id(), entry.message, entry.play_text);
    }
    Ok(())
}
