use crate::classify::{LogKind, Outcome};
use crate::types::Play;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of a league's activity feed, keyed by play index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub play_index: usize,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub points: u64,
    pub play_text: String,
    /// Set by the store on first write.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ActivityLogEntry {
    pub fn describe(play: &Play, holder: &str, outcome: Outcome) -> Self {
        Self {
            play_index: play.index,
            message: message_for(holder, outcome),
            kind: outcome.kind(),
            points: outcome.points(),
            play_text: play.text_or_empty().to_string(),
            timestamp: None,
        }
    }

    pub fn doc_id(&self) -> String {
        activity_doc_id(self.play_index)
    }

    /// Equal in everything but the store-assigned timestamp.
    pub fn same_content(&self, other: &Self) -> bool {
        self.play_index == other.play_index
            && self.message == other.message
            && self.kind == other.kind
            && self.points == other.points
            && self.play_text == other.play_text
    }
}

pub fn activity_doc_id(play_index: usize) -> String {
    format!("play_{play_index:03}")
}

pub fn message_for(holder: &str, outcome: Outcome) -> String {
    match outcome {
        Outcome::Null => "GAME UPDATE".to_string(),
        Outcome::Touchdown => format!("{holder} +7 (TD)"),
        Outcome::Burn => format!("{holder} 🔥"),
        Outcome::Survived => format!("{holder} +1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(message_for("amy", Outcome::Touchdown), "amy +7 (TD)");
        assert_eq!(message_for("amy", Outcome::Burn), "amy 🔥");
        assert_eq!(message_for("amy", Outcome::Survived), "amy +1");
        assert_eq!(message_for("amy", Outcome::Null), "GAME UPDATE");
    }

    #[test]
    fn test_doc_id_is_zero_padded() {
        assert_eq!(activity_doc_id(7), "play_007");
        assert_eq!(activity_doc_id(1234), "play_1234");
    }

    #[test]
    fn test_describe_is_reproducible() {
        let mut play = Play::new("Timeout.");
        play.index = 12;
        let a = ActivityLogEntry::describe(&play, "amy", Outcome::Null);
        let mut b = ActivityLogEntry::describe(&play, "amy", Outcome::Null);
        assert_eq!(a, b);
        assert_eq!(a.kind, LogKind::Neutral);
        assert_eq!(a.doc_id(), "play_012");

        b.timestamp = Some(Utc::now());
        assert_ne!(a, b);
        assert!(a.same_content(&b));
    }

    #[test]
    fn test_entry_serializes_kind_as_type() {
        let entry = ActivityLogEntry::describe(&Play::new("x"), "amy", Outcome::Burn);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "burn");
        assert_eq!(json["points"], 0);
    }
}
