use crate::config::Roster;
use crate::types::{Hand, Play};
use serde::{Deserialize, Serialize};

/// Play text fragments that mark an administrative or dead-ball event.
const NULL_PHRASES: [&str; 5] = ["timeout", "end quarter", "end game", "touchback", "spike"];

/// Stat category that marks a special-teams kicking play.
const KICKING_CATEGORY: &str = "kicking";

const TOUCHDOWN: &str = "touchdown";

/// How an activity log entry is presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Neutral,
    Score,
    Burn,
}

/// The effect of one play on the holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Administrative or kicking play; nothing happens.
    Null,
    /// The holder's player scored. The holder keeps the pigskin.
    Touchdown,
    /// The holder's player was involved in a non-scoring play.
    Burn,
    /// The holder's players stayed out of the play.
    Survived,
}

impl Outcome {
    pub fn points(self) -> u64 {
        match self {
            Outcome::Null | Outcome::Burn => 0,
            Outcome::Touchdown => 7,
            Outcome::Survived => 1,
        }
    }

    pub fn should_rotate(self) -> bool {
        matches!(self, Outcome::Burn)
    }

    pub fn kind(self) -> LogKind {
        match self {
            Outcome::Null => LogKind::Neutral,
            Outcome::Touchdown | Outcome::Survived => LogKind::Score,
            Outcome::Burn => LogKind::Burn,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    pub is_null: bool,
    pub holder_involved: bool,
    /// The record lacked text or stats and was treated as a null play.
    pub malformed: bool,
}

impl Classification {
    pub fn points_to_add(&self) -> u64 {
        self.outcome.points()
    }

    pub fn should_rotate(&self) -> bool {
        self.outcome.should_rotate()
    }

    pub fn kind(&self) -> LogKind {
        self.outcome.kind()
    }
}

/// Classify `play` against the holder's current hand.
///
/// Pure: the same play and hand always give the same result. A holder with
/// no hand is never involved.
pub fn classify(play: &Play, hand: Option<&Hand>, roster: &Roster) -> Classification {
    let malformed = play.is_malformed();
    let text = play.text_or_empty().to_lowercase();

    if malformed || is_null_play(play, &text) {
        return Classification {
            outcome: Outcome::Null,
            is_null: true,
            holder_involved: false,
            malformed,
        };
    }

    let holder_involved = hand.is_some_and(|hand| is_involved(play, &text, hand, roster));
    let outcome = match (holder_involved, text.contains(TOUCHDOWN)) {
        (true, true) => Outcome::Touchdown,
        (true, false) => Outcome::Burn,
        (false, _) => Outcome::Survived,
    };

    Classification {
        outcome,
        is_null: false,
        holder_involved,
        malformed: false,
    }
}

/// `text` must already be lowercase.
fn is_null_play(play: &Play, text: &str) -> bool {
    let kicking = play.player_stats.iter().flatten().any(|(_, categories)| {
        categories
            .keys()
            .any(|category| category.eq_ignore_ascii_case(KICKING_CATEGORY))
    });
    kicking || NULL_PHRASES.iter().any(|phrase| text.contains(phrase))
}

/// A hand player is involved when the play carries a stat line for them, or
/// when their surname shows up in the text (incompletions carry no stats).
fn is_involved(play: &Play, text: &str, hand: &Hand, roster: &Roster) -> bool {
    hand.player_ids.iter().any(|player| {
        let has_stats = play
            .player_stats
            .as_ref()
            .is_some_and(|stats| stats.contains_key(player));
        has_stats || roster.surname(player).is_some_and(|surname| text.contains(surname))
    })
}
