use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub type PlayerId = String;
pub type LeagueId = String;
pub type MemberId = String;

/// Stat name → value as published by the feed (values arrive as strings).
pub type StatLine = BTreeMap<String, serde_json::Value>;

/// Stat category (`Rushing`, `Kicking`, ...) → stat line.
pub type StatCategories = BTreeMap<String, StatLine>;

/// A single play record from the live feed.
///
/// `text` and `player_stats` are optional because the feed occasionally
/// publishes records without them; such records are scored as null plays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    /// Position in the play log. Assigned by [`PlayLog::new`].
    #[serde(default)]
    pub index: usize,
    #[serde(default, alias = "play")]
    pub text: Option<String>,
    #[serde(default, alias = "playClock")]
    pub clock: Option<String>,
    #[serde(default, alias = "playPeriod")]
    pub period: Option<String>,
    #[serde(default)]
    pub player_stats: Option<BTreeMap<PlayerId, StatCategories>>,
}

impl Play {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            player_stats: Some(BTreeMap::new()),
            ..Self::default()
        }
    }

    /// Add a single stat for a player, creating the category as needed.
    pub fn with_stat(
        mut self,
        player: impl Into<PlayerId>,
        category: impl Into<String>,
        stat: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.player_stats
            .get_or_insert_with(BTreeMap::new)
            .entry(player.into())
            .or_default()
            .entry(category.into())
            .or_default()
            .insert(stat.into(), serde_json::Value::String(value.into()));
        self
    }

    /// A record is malformed when the feed left out its text or its stats.
    pub fn is_malformed(&self) -> bool {
        self.text.is_none() || self.player_stats.is_none()
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Immutable snapshot of the shared, ordered play log.
///
/// Cloning is cheap; every league processed within a tick reads the same
/// snapshot.
#[derive(Clone, Debug, Default)]
pub struct PlayLog {
    plays: Arc<[Play]>,
}

impl PlayLog {
    /// Build a snapshot, stamping each play with its position in the log.
    pub fn new(plays: Vec<Play>) -> Self {
        let plays: Vec<Play> = plays
            .into_iter()
            .enumerate()
            .map(|(index, mut play)| {
                play.index = index;
                play
            })
            .collect();
        Self {
            plays: plays.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Play> {
        self.plays.get(index)
    }

    /// Plays from `start` to the end of the log, in index order.
    pub fn plays_from(&self, start: usize) -> &[Play] {
        self.plays.get(start..).unwrap_or(&[])
    }
}

/// The feed document maintained by the external ingester.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeed {
    #[serde(default, alias = "gameID")]
    pub game_id: String,
    #[serde(default)]
    pub home_score: u32,
    #[serde(default)]
    pub away_score: u32,
    #[serde(default)]
    pub clock: String,
    #[serde(default)]
    pub period: String,
    #[serde(default, alias = "allPlayByPlay")]
    pub plays: Vec<Play>,
}

impl LiveFeed {
    pub fn play_log(&self) -> PlayLog {
        PlayLog::new(self.plays.clone())
    }
}

/// Identifies one dealt hand within a league. Strictly increasing per league.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandToken(pub u64);

/// One candidate player from each tier, in tier order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hand {
    pub token: HandToken,
    pub player_ids: [PlayerId; 3],
}

impl Hand {
    pub fn holds(&self, player: &str) -> bool {
        self.player_ids.iter().any(|id| id == player)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub username: String,
    /// Rank in the rotation: 1 is the holder, 2 is on deck.
    pub queue_order: u32,
    #[serde(default)]
    pub hand: Option<Hand>,
    #[serde(default)]
    pub score_total: u64,
}

impl Member {
    /// A freshly joined member: empty hand, zero score.
    pub fn new(id: impl Into<MemberId>, username: impl Into<String>, queue_order: u32) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            queue_order,
            hand: None,
            score_total: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Pigskin,
    #[serde(other)]
    Other,
}

fn no_play_yet() -> i64 {
    -1
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct League {
    pub id: LeagueId,
    pub game_mode: GameMode,
    /// Index of the last applied play; `-1` when nothing has been applied.
    #[serde(default = "no_play_yet")]
    pub last_play_index: i64,
    /// Number of hands dealt so far; the source of [`HandToken`]s.
    #[serde(default)]
    pub hands_dealt: u64,
}

/// Where a league resumes within a log of a given length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resume {
    pub start: usize,
    /// The stored cursor pointed past the end of the log and was discarded.
    pub cursor_reset: bool,
}

impl League {
    pub fn new(id: impl Into<LeagueId>, game_mode: GameMode) -> Self {
        Self {
            id: id.into(),
            game_mode,
            last_play_index: no_play_yet(),
            hands_dealt: 0,
        }
    }

    pub fn resume(&self, log_len: usize) -> Resume {
        if self.last_play_index >= log_len as i64 {
            return Resume {
                start: 0,
                cursor_reset: true,
            };
        }
        Resume {
            start: (self.last_play_index + 1).max(0) as usize,
            cursor_reset: false,
        }
    }
}

/// Players currently excluded from dealing. Maintained externally.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InjurySet(BTreeSet<PlayerId>);

impl InjurySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, player: &str) -> bool {
        self.0.contains(player)
    }

    pub fn insert(&mut self, player: impl Into<PlayerId>) -> bool {
        self.0.insert(player.into())
    }

    pub fn remove(&mut self, player: &str) -> bool {
        self.0.remove(player)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<PlayerId>> FromIterator<S> for InjurySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
