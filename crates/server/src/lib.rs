pub mod driver;
pub mod errors;
pub mod memory;
pub mod server;
pub mod store;
pub mod tick_loop;
pub mod types;

pub use driver::{sync_league, TickSnapshot};
pub use errors::{AdminError, LeagueError, StoreError, TickError};
pub use memory::{MemoryFeed, MemoryStore};
pub use server::SyncServer;
pub use store::{LeagueStore, PlayFeed};
pub use tick_loop::{run_sync_loop, spawn_sync_loop, SyncLoopHandle};
pub use types::{LeagueOutcome, LeagueReport, ServerConfig, TickReport};
