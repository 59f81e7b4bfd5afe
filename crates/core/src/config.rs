use crate::types::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Number of tiers; a hand holds one player from each.
pub const TIER_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("tier {0} is missing from the tier pool")]
    MissingTier(u8),
    #[error("tier {0} has no players configured")]
    EmptyTier(u8),
    #[error("unknown tier {0}, tiers are numbered 1 to 3")]
    UnknownTier(u8),
    #[error("invalid game config: {0}")]
    Parse(String),
}

/// Candidate players grouped by tier.
///
/// Every tier has at least one configured player, so a complete hand can
/// always be dealt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<u8, Vec<PlayerId>>",
    into = "BTreeMap<u8, Vec<PlayerId>>"
)]
pub struct TierPool {
    tiers: [Vec<PlayerId>; TIER_COUNT],
}

impl TierPool {
    pub fn new(
        tier1: Vec<PlayerId>,
        tier2: Vec<PlayerId>,
        tier3: Vec<PlayerId>,
    ) -> Result<Self, ConfigError> {
        let tiers = [tier1, tier2, tier3];
        for (i, players) in tiers.iter().enumerate() {
            if players.is_empty() {
                return Err(ConfigError::EmptyTier(i as u8 + 1));
            }
        }
        Ok(Self { tiers })
    }

    /// Players configured for `tier` (1-based). Empty for unknown tiers.
    pub fn tier(&self, tier: u8) -> &[PlayerId] {
        match tier {
            1..=3 => &self.tiers[tier as usize - 1],
            _ => &[],
        }
    }

    /// Tiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &[PlayerId])> {
        self.tiers
            .iter()
            .enumerate()
            .map(|(i, players)| (i as u8 + 1, players.as_slice()))
    }

    pub fn tier_of(&self, player: &str) -> Option<u8> {
        self.iter()
            .find(|(_, players)| players.iter().any(|p| p == player))
            .map(|(tier, _)| tier)
    }
}

impl TryFrom<BTreeMap<u8, Vec<PlayerId>>> for TierPool {
    type Error = ConfigError;

    fn try_from(mut map: BTreeMap<u8, Vec<PlayerId>>) -> Result<Self, Self::Error> {
        if let Some(&unknown) = map.keys().find(|&&t| t == 0 || t as usize > TIER_COUNT) {
            return Err(ConfigError::UnknownTier(unknown));
        }
        let mut take = |tier: u8| map.remove(&tier).ok_or(ConfigError::MissingTier(tier));
        let (t1, t2, t3) = (take(1)?, take(2)?, take(3)?);
        Self::new(t1, t2, t3)
    }
}

impl From<TierPool> for BTreeMap<u8, Vec<PlayerId>> {
    fn from(pool: TierPool) -> Self {
        let [t1, t2, t3] = pool.tiers;
        BTreeMap::from([(1, t1), (2, t2), (3, t3)])
    }
}

/// Player ID → display name, plus the lowercase surname used to spot a
/// player in play text when the feed recorded no stat line for them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<PlayerId, String>",
    into = "BTreeMap<PlayerId, String>"
)]
pub struct Roster {
    names: BTreeMap<PlayerId, String>,
    surnames: BTreeMap<PlayerId, String>,
}

impl Roster {
    pub fn insert(&mut self, player: impl Into<PlayerId>, name: impl Into<String>) {
        let player = player.into();
        let name = name.into();
        match surname_of(&name) {
            Some(surname) => {
                self.surnames.insert(player.clone(), surname);
            }
            None => {
                self.surnames.remove(&player);
            }
        }
        self.names.insert(player, name);
    }

    pub fn name(&self, player: &str) -> Option<&str> {
        self.names.get(player).map(String::as_str)
    }

    /// Lowercase surname, e.g. `"walker iii"` for "Kenneth Walker III".
    pub fn surname(&self, player: &str) -> Option<&str> {
        self.surnames.get(player).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Everything after the first word; single-word names are used whole.
fn surname_of(name: &str) -> Option<String> {
    let words: Vec<&str> = name.split_whitespace().collect();
    let surname = match words.as_slice() {
        [] => return None,
        [only] => only.to_string(),
        [_, rest @ ..] => rest.join(" "),
    };
    Some(surname.to_lowercase())
}

impl From<BTreeMap<PlayerId, String>> for Roster {
    fn from(names: BTreeMap<PlayerId, String>) -> Self {
        let mut roster = Roster::default();
        for (player, name) in names {
            roster.insert(player, name);
        }
        roster
    }
}

impl From<Roster> for BTreeMap<PlayerId, String> {
    fn from(roster: Roster) -> Self {
        roster.names
    }
}

impl<P: Into<PlayerId>, N: Into<String>> FromIterator<(P, N)> for Roster {
    fn from_iter<I: IntoIterator<Item = (P, N)>>(iter: I) -> Self {
        let mut roster = Roster::default();
        for (player, name) in iter {
            roster.insert(player, name);
        }
        roster
    }
}

/// Static per-game configuration: who can be dealt and how to name them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub game_id: String,
    pub tiers: TierPool,
    #[serde(default)]
    pub roster: Roster,
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// NE @ SEA, February 8th 2026. Kickers are left out of the pools.
    pub fn super_bowl_lx() -> Self {
        let ids = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let tiers = TierPool {
            tiers: [
                ids(&["4431452", "4569173", "4567048", "4431566"]),
                ids(&["2976212", "3046439", "5000001", "2977187", "4426514"]),
                ids(&["4241478", "4431526", "3052876", "4431611", "3912547"]),
            ],
        };
        let roster = [
            ("4431452", "Drake Maye"),
            ("4569173", "Rhamondre Stevenson"),
            ("2976212", "Stefon Diggs"),
            ("3046439", "Hunter Henry"),
            ("5000001", "TreVeyon Henderson"),
            ("4241478", "Antonio Gibson"),
            ("4431526", "Kayshon Boutte"),
            ("3052876", "Mack Hollins"),
            ("4567048", "Kenneth Walker III"),
            ("4431566", "Jaxon Smith-Njigba"),
            ("2977187", "Cooper Kupp"),
            ("4426514", "George Holani"),
            ("3912547", "Sam Darnold"),
            ("4431611", "AJ Barner"),
            ("4684940", "Rashid Shaheed"),
        ]
        .into_iter()
        .collect();
        Self {
            game_id: "20260208_NE@SEA".to_string(),
            tiers,
            roster,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::super_bowl_lx()
    }
}
