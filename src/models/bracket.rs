//! Transient bracket data that only lives for the duration of an import.

use serde::{Deserialize, Serialize};

use super::DeckCounters;

/// A bracket participant as reported by the bracket API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Bracket-assigned participant id
    pub id: i64,

    /// Display name, expected to be `"Player - Deck"`
    #[serde(default)]
    pub name: String,

    /// Final placement, only present once the tournament is finalized
    #[serde(default)]
    pub final_rank: Option<u32>,
}

impl Participant {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            final_rank: None,
        }
    }
}

/// A single bracket match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default)]
    pub player1_id: Option<i64>,

    #[serde(default)]
    pub player2_id: Option<i64>,

    /// Winning participant; `None` or `0` means the match was tied
    #[serde(default)]
    pub winner_id: Option<i64>,

    /// Score string, `"A-B"` (optionally several comma-separated sets)
    #[serde(default)]
    pub scores_csv: String,
}

impl Match {
    pub fn new(player1_id: i64, player2_id: i64, winner_id: i64, scores_csv: &str) -> Self {
        Self {
            player1_id: Some(player1_id),
            player2_id: Some(player2_id),
            winner_id: Some(winner_id),
            scores_csv: scores_csv.to_string(),
        }
    }

    /// The winner id, with ties collapsed to `None`.
    pub fn decisive_winner(&self) -> Option<i64> {
        self.winner_id.filter(|id| *id != 0)
    }
}

/// Wire envelope: `{"participant": {...}}`.
#[derive(Debug, Deserialize)]
pub struct ParticipantEnvelope {
    pub participant: Participant,
}

/// Wire envelope: `{"match": {...}}`.
#[derive(Debug, Deserialize)]
pub struct MatchEnvelope {
    #[serde(rename = "match")]
    pub match_: Match,
}

/// Counters accumulated for one participant across a bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantTally {
    pub participant_id: i64,
    pub display_name: String,
    pub counters: DeckCounters,
    pub is_champion: bool,
}

impl ParticipantTally {
    pub fn new(participant: &Participant) -> Self {
        Self {
            participant_id: participant.id,
            display_name: participant.name.clone(),
            counters: DeckCounters::default(),
            is_champion: false,
        }
    }

    /// Counters to merge into the stored deck, including the tournament win.
    pub fn delta(&self) -> DeckCounters {
        DeckCounters {
            tourny_wins: i64::from(self.is_champion),
            ..self.counters
        }
    }
}
