pub mod activity;
pub mod classify;
pub mod config;
pub mod deal;
pub mod types;

pub use activity::{activity_doc_id, ActivityLogEntry};
pub use classify::{classify, Classification, LogKind, Outcome};
pub use config::{ConfigError, GameConfig, Roster, TierPool, TIER_COUNT};
pub use deal::{deal, deal_seed, shuffle_seed, Deal};
pub use types::{
    GameMode, Hand, HandToken, InjurySet, League, LeagueId, LiveFeed, Member, MemberId, Play,
    PlayLog, PlayerId, Resume, StatCategories, StatLine,
};
