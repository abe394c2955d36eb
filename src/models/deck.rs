//! Deck model and the counters folded in by tournament imports.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// Aggregate win/loss counters for a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckCounters {
    #[sqlx(rename = "GamesWon")]
    pub games_won: i64,

    #[sqlx(rename = "GamesLost")]
    pub games_lost: i64,

    #[sqlx(rename = "MatchesWon")]
    pub matches_won: i64,

    #[sqlx(rename = "MatchesLost")]
    pub matches_lost: i64,

    #[sqlx(rename = "MatchesTied")]
    pub matches_tied: i64,

    #[sqlx(rename = "TournyWins")]
    pub tourny_wins: i64,
}

impl DeckCounters {
    /// Sum of two sets of counters, or `None` if any counter overflows.
    pub fn checked_merge(&self, other: &DeckCounters) -> Option<DeckCounters> {
        Some(DeckCounters {
            games_won: self.games_won.checked_add(other.games_won)?,
            games_lost: self.games_lost.checked_add(other.games_lost)?,
            matches_won: self.matches_won.checked_add(other.matches_won)?,
            matches_lost: self.matches_lost.checked_add(other.matches_lost)?,
            matches_tied: self.matches_tied.checked_add(other.matches_tied)?,
            tourny_wins: self.tourny_wins.checked_add(other.tourny_wins)?,
        })
    }
}

/// A stored deck row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    #[sqlx(rename = "ID")]
    pub id: i64,

    #[sqlx(rename = "PlayerName")]
    pub player_name: String,

    #[sqlx(rename = "DeckName")]
    pub deck_name: String,

    #[serde(flatten)]
    #[sqlx(flatten)]
    pub counters: DeckCounters,
}

/// Request body for creating a deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeck {
    pub player_name: String,
    pub deck_name: String,

    #[serde(flatten)]
    pub counters: DeckCounters,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Display name {0:?} is not of the form \"Player - Deck\"")]
pub struct MalformedDisplayName(pub String);

/// Identity of a deck: the owning player and the deck name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckKey {
    pub player_name: String,
    pub deck_name: String,
}

impl DeckKey {
    pub fn new(player_name: impl Into<String>, deck_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            deck_name: deck_name.into(),
        }
    }

    /// Parse a bracket display name of the form `"Player - Deck"`.
    ///
    /// Splits at the first `-`, trims and lower-cases both halves.
    pub fn from_display_name(display_name: &str) -> Result<Self, MalformedDisplayName> {
        let (player, deck) = display_name
            .split_once('-')
            .ok_or_else(|| MalformedDisplayName(display_name.to_string()))?;

        let player = player.trim().to_lowercase();
        let deck = deck.trim().to_lowercase();
        if player.is_empty() || deck.is_empty() {
            return Err(MalformedDisplayName(display_name.to_string()));
        }

        Ok(Self::new(player, deck))
    }
}
