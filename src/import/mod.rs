//! Tournament import.
//!
//! Pulls a finished bracket from the bracket service, tallies per-participant
//! game and match counters, marks the champion and merges everything into the
//! stats store. Every deck upsert commits on its own: a failure part-way
//! through leaves the decks processed so far updated.
//!
//! Imports are not de-duplicated. Importing the same tournament twice adds its
//! results twice; repeat imports are only flagged in the logs and the report.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bracket::{
    locator_from_config, tournament_id_from_link, BracketError, BracketSource, ChallongeClient,
    ChampionLocator,
};
use crate::config::BracketConfig;
use crate::models::{
    DeckCounters, DeckKey, MalformedDisplayName, Match, Participant, ParticipantTally,
};
use crate::storage::{StatsStore, StorageError};

/// Errors that abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Could not find a tournament id in link {0:?}")]
    InvalidLink(String),

    #[error("Bracket service error: {0}")]
    Bracket(#[from] BracketError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Match references unknown participant {0}")]
    UnknownParticipant(i64),

    #[error("Match is missing a participant")]
    MissingParticipant,

    #[error("Unparseable score {0:?}")]
    InvalidScore(String),

    #[error("Counters for {0:?} overflow")]
    CounterOverflow(String),

    #[error(transparent)]
    MalformedDisplayName(#[from] MalformedDisplayName),
}

static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*-\s*(\d+)").expect("score pattern is valid"));

/// Parse a score string `"A-B"` into `(A, B)`.
///
/// Multi-set scores (`"2-1,0-2"`) only count their first set.
pub fn parse_score(scores_csv: &str) -> Result<(i64, i64), ImportError> {
    let invalid = || ImportError::InvalidScore(scores_csv.to_string());

    let caps = SCORE_RE.captures(scores_csv).ok_or_else(invalid)?;
    let first = caps[1].parse().map_err(|_| invalid())?;
    let second = caps[2].parse().map_err(|_| invalid())?;
    Ok((first, second))
}

/// Accumulate per-participant counters over all matches.
///
/// Tallies come back in participant order. Games are credited from the score
/// regardless of outcome; the winner id only decides won/lost versus tied.
pub fn tally_matches(
    participants: &[Participant],
    matches: &[Match],
) -> Result<Vec<ParticipantTally>, ImportError> {
    let mut tallies: Vec<ParticipantTally> =
        participants.iter().map(ParticipantTally::new).collect();
    let index: HashMap<i64, usize> = participants
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id, i))
        .collect();

    let resolve = |id: Option<i64>| -> Result<usize, ImportError> {
        let id = id.ok_or(ImportError::MissingParticipant)?;
        index
            .get(&id)
            .copied()
            .ok_or(ImportError::UnknownParticipant(id))
    };

    for m in matches {
        let p1 = resolve(m.player1_id)?;
        let p2 = resolve(m.player2_id)?;
        let (score1, score2) = parse_score(&m.scores_csv)?;

        let mut first = DeckCounters {
            games_won: score1,
            games_lost: score2,
            ..Default::default()
        };
        let mut second = DeckCounters {
            games_won: score2,
            games_lost: score1,
            ..Default::default()
        };

        match m.decisive_winner() {
            None => {
                first.matches_tied = 1;
                second.matches_tied = 1;
            }
            Some(winner) if Some(winner) == m.player1_id => {
                first.matches_won = 1;
                second.matches_lost = 1;
            }
            Some(winner) if Some(winner) == m.player2_id => {
                second.matches_won = 1;
                first.matches_lost = 1;
            }
            Some(winner) => return Err(ImportError::UnknownParticipant(winner)),
        }

        credit(&mut tallies[p1], &first)?;
        credit(&mut tallies[p2], &second)?;
    }

    Ok(tallies)
}

fn credit(tally: &mut ParticipantTally, counters: &DeckCounters) -> Result<(), ImportError> {
    tally.counters = tally
        .counters
        .checked_merge(counters)
        .ok_or_else(|| ImportError::CounterOverflow(tally.display_name.clone()))?;
    Ok(())
}

/// Per-deck line of an import report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckImport {
    pub player_name: String,
    pub deck_name: String,

    /// Whether the deck row was created by this import
    pub created: bool,

    /// Counters added by this import
    pub counters: DeckCounters,
}

/// Summary of a completed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub tournament_id: String,

    /// Imports of this tournament recorded before this one
    pub previous_imports: i64,

    /// Display name of the champion, when one was found
    pub champion: Option<String>,

    pub decks: Vec<DeckImport>,
}

/// Imports bracket results into the stats store.
pub struct Importer {
    store: StatsStore,
    source: Arc<dyn BracketSource>,
    champion: Arc<dyn ChampionLocator>,
}

impl Importer {
    pub fn new(
        store: StatsStore,
        source: Arc<dyn BracketSource>,
        champion: Arc<dyn ChampionLocator>,
    ) -> Self {
        Self {
            store,
            source,
            champion,
        }
    }

    /// Build an importer talking to Challonge as configured.
    pub fn from_config(store: StatsStore, config: &BracketConfig) -> Result<Self, ImportError> {
        let source = Arc::new(ChallongeClient::from_config(config)?);
        let champion: Arc<dyn ChampionLocator> = Arc::from(locator_from_config(config)?);
        Ok(Self::new(store, source, champion))
    }

    /// Import the tournament behind `link`.
    pub async fn import(&self, link: &str) -> Result<ImportReport, ImportError> {
        let tournament_id =
            tournament_id_from_link(link).ok_or_else(|| ImportError::InvalidLink(link.to_string()))?;
        info!(
            "Importing tournament {} via {}",
            tournament_id,
            self.source.name()
        );

        let participants = self.source.participants(&tournament_id).await?;
        let matches = self.source.matches(&tournament_id).await?;
        let mut tallies = tally_matches(&participants, &matches)?;

        let champion = self.locate_champion(&tournament_id, &participants).await;
        let mut champion_name = None;
        if let Some(champion_id) = champion {
            if let Some(tally) = tallies.iter_mut().find(|t| t.participant_id == champion_id) {
                tally.is_champion = true;
                champion_name = Some(tally.display_name.clone());
            }
        }

        let previous_imports = self.store.import_count(&tournament_id).await?;
        if previous_imports > 0 {
            warn!(
                "Tournament {} was already imported {} time(s); its results will be counted again",
                tournament_id, previous_imports
            );
        }

        let mut decks = Vec::with_capacity(tallies.len());
        for tally in &tallies {
            let key = DeckKey::from_display_name(&tally.display_name)?;
            let delta = tally.delta();
            let outcome = self.store.upsert_deck_counters(&key, &delta).await?;

            debug!(
                "{} deck {}/{} ({})",
                if outcome.was_inserted() { "Created" } else { "Updated" },
                key.player_name,
                key.deck_name,
                outcome.deck().id
            );

            decks.push(DeckImport {
                player_name: key.player_name,
                deck_name: key.deck_name,
                created: outcome.was_inserted(),
                counters: delta,
            });
        }

        self.store
            .record_import(&tournament_id, tallies.len())
            .await?;

        info!(
            "Imported {} decks from {} ({} matches)",
            decks.len(),
            tournament_id,
            matches.len()
        );

        Ok(ImportReport {
            tournament_id,
            previous_imports,
            champion: champion_name,
            decks,
        })
    }

    /// Champion detection is best-effort; failures only cost the tournament win.
    async fn locate_champion(&self, tournament_id: &str, participants: &[Participant]) -> Option<i64> {
        match self.champion.locate(tournament_id, participants).await {
            Ok(Some(id)) => Some(id),
            Ok(None) => {
                warn!(
                    "{}: no champion found for {}",
                    self.champion.name(),
                    tournament_id
                );
                None
            }
            Err(e) => {
                warn!(
                    "{}: champion lookup failed for {}: {}",
                    self.champion.name(),
                    tournament_id,
                    e
                );
                None
            }
        }
    }
}
