pub mod host;

pub use host::{DealContext, HostError, HostStats, LeagueCommit, LeagueHost, MemberKey, PlayStep};
