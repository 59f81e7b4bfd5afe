use crate::server::SyncServer;
use crate::store::{LeagueStore, PlayFeed};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Run ticks on the configured interval until shutdown is requested or
/// `max_ticks` have run. Returns the number of ticks run.
///
/// A failed tick is logged and the loop carries on; nothing advanced, so
/// the next tick retries the same work.
pub async fn run_sync_loop<S, F>(server: Arc<SyncServer<S, F>>, shutdown: Arc<AtomicBool>) -> u64
where
    S: LeagueStore + ?Sized,
    F: PlayFeed + ?Sized,
{
    let period = Duration::from_millis(server.config.tick_interval_ms.max(1));
    let max_ticks = server.config.max_ticks;

    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut ran = 0u64;
    loop {
        interval.tick().await;

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        if max_ticks.is_some_and(|max| ran >= max) {
            break;
        }

        if let Err(e) = server.run_tick().await {
            warn!(error = %e, "tick failed");
        }
        ran += 1;
    }

    info!(ticks = ran, "sync loop stopped");
    ran
}

/// A sync loop running on its own task.
pub struct SyncLoopHandle {
    shutdown: Arc<AtomicBool>,
    task: JoinHandle<u64>,
}

impl SyncLoopHandle {
    /// The loop stops before its next tick.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the loop to stop and return the number of ticks it ran.
    pub async fn join(self) -> Result<u64, JoinError> {
        self.task.await
    }
}

/// Spawn a sync loop as a tokio task.
pub fn spawn_sync_loop<S, F>(server: Arc<SyncServer<S, F>>) -> SyncLoopHandle
where
    S: LeagueStore + ?Sized + 'static,
    F: PlayFeed + ?Sized + 'static,
{
    let shutdown = Arc::new(AtomicBool::new(false));
    let task = tokio::spawn(run_sync_loop(server, shutdown.clone()));
    SyncLoopHandle { shutdown, task }
}
