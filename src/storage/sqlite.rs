//! SQLite-backed implementation of the stats store.

use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::StorageError;
use crate::models::{Deck, DeckCounters, DeckKey, NewDeck, NewPlayer, Player};

const SCHEMA: [&str; 4] = [
    r#"CREATE TABLE IF NOT EXISTS "Players" (
        "ID" INTEGER PRIMARY KEY AUTOINCREMENT,
        "Name" TEXT NOT NULL,
        "Wins" INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "Decks" (
        "ID" INTEGER PRIMARY KEY AUTOINCREMENT,
        "PlayerName" TEXT NOT NULL,
        "DeckName" TEXT NOT NULL,
        "GamesWon" INTEGER NOT NULL DEFAULT 0,
        "GamesLost" INTEGER NOT NULL DEFAULT 0,
        "MatchesWon" INTEGER NOT NULL DEFAULT 0,
        "MatchesLost" INTEGER NOT NULL DEFAULT 0,
        "MatchesTied" INTEGER NOT NULL DEFAULT 0,
        "TournyWins" INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "DecksByOwner" ON "Decks" ("PlayerName", "DeckName")"#,
    r#"CREATE TABLE IF NOT EXISTS "Imports" (
        "ID" INTEGER PRIMARY KEY AUTOINCREMENT,
        "TournamentId" TEXT NOT NULL,
        "Participants" INTEGER NOT NULL,
        "ImportedAt" TEXT NOT NULL
    )"#,
];

/// Result of merging counters into a deck row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed; a new one was seeded from the delta
    Inserted(Deck),

    /// The delta was added onto an existing row
    Updated(Deck),
}

impl UpsertOutcome {
    pub fn deck(&self) -> &Deck {
        match self {
            UpsertOutcome::Inserted(deck) | UpsertOutcome::Updated(deck) => deck,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, UpsertOutcome::Inserted(_))
    }
}

/// Player and deck statistics store.
#[derive(Debug, Clone)]
pub struct StatsStore {
    pool: SqlitePool,
}

impl StatsStore {
    /// Connect to the database at `url`, creating it and its tables if needed.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        info!("Connected to stats database at {}", url);
        Ok(store)
    }

    /// Open a private in-memory database.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn list_players(&self) -> Result<Vec<Player>, StorageError> {
        Ok(sqlx::query_as(r#"SELECT * FROM "Players" ORDER BY "ID""#)
            .fetch_all(&self.pool)
            .await?)
    }

    /// List all decks, grouped by owner when `sort_by_player` is set.
    pub async fn list_decks(&self, sort_by_player: bool) -> Result<Vec<Deck>, StorageError> {
        let sql = if sort_by_player {
            r#"SELECT * FROM "Decks" ORDER BY "PlayerName", "ID""#
        } else {
            r#"SELECT * FROM "Decks" ORDER BY "ID""#
        };

        Ok(sqlx::query_as(sql).fetch_all(&self.pool).await?)
    }

    pub async fn list_decks_for_player(&self, player_name: &str) -> Result<Vec<Deck>, StorageError> {
        Ok(
            sqlx::query_as(r#"SELECT * FROM "Decks" WHERE "PlayerName" = ? ORDER BY "ID""#)
                .bind(player_name)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn insert_player(&self, player: &NewPlayer) -> Result<Player, StorageError> {
        let stored: Player =
            sqlx::query_as(r#"INSERT INTO "Players" ("Name", "Wins") VALUES (?, ?) RETURNING *"#)
                .bind(&player.name)
                .bind(player.wins)
                .fetch_one(&self.pool)
                .await?;

        debug!("Inserted player {} ({})", stored.name, stored.id);
        Ok(stored)
    }

    pub async fn insert_deck(&self, deck: &NewDeck) -> Result<Deck, StorageError> {
        let key = DeckKey::new(deck.player_name.clone(), deck.deck_name.clone());
        let stored = insert_deck_row(&self.pool, &key, &deck.counters).await?;

        debug!(
            "Inserted deck {}/{} ({})",
            stored.player_name, stored.deck_name, stored.id
        );
        Ok(stored)
    }

    /// Find the deck for a (player, deck) pair.
    ///
    /// No uniqueness constraint exists on the pair; the oldest row wins.
    pub async fn find_deck(&self, key: &DeckKey) -> Result<Option<Deck>, StorageError> {
        Ok(sqlx::query_as(
            r#"SELECT * FROM "Decks" WHERE "PlayerName" = ? AND "DeckName" = ? ORDER BY "ID" LIMIT 1"#,
        )
        .bind(&key.player_name)
        .bind(&key.deck_name)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Insert a deck seeded from `delta`, or add `delta` onto the existing row.
    ///
    /// The transaction opens with the write so SQLite takes the write lock
    /// up front; a concurrent importer waits on the busy timeout instead of
    /// failing on a stale read snapshot.
    pub async fn upsert_deck_counters(
        &self,
        key: &DeckKey,
        delta: &DeckCounters,
    ) -> Result<UpsertOutcome, StorageError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<Deck> = sqlx::query_as(
            r#"UPDATE "Decks" SET
                "GamesWon" = "GamesWon" + ?,
                "GamesLost" = "GamesLost" + ?,
                "MatchesWon" = "MatchesWon" + ?,
                "MatchesLost" = "MatchesLost" + ?,
                "MatchesTied" = "MatchesTied" + ?,
                "TournyWins" = "TournyWins" + ?
            WHERE "ID" = (
                SELECT "ID" FROM "Decks"
                WHERE "PlayerName" = ? AND "DeckName" = ?
                ORDER BY "ID" LIMIT 1
            )
            RETURNING *"#,
        )
        .bind(delta.games_won)
        .bind(delta.games_lost)
        .bind(delta.matches_won)
        .bind(delta.matches_lost)
        .bind(delta.matches_tied)
        .bind(delta.tourny_wins)
        .bind(&key.player_name)
        .bind(&key.deck_name)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match updated {
            Some(deck) => UpsertOutcome::Updated(deck),
            None => UpsertOutcome::Inserted(insert_deck_row(&mut *tx, key, delta).await?),
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Number of completed imports recorded for a tournament.
    pub async fn import_count(&self, tournament_id: &str) -> Result<i64, StorageError> {
        Ok(
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM "Imports" WHERE "TournamentId" = ?"#)
                .bind(tournament_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    pub async fn record_import(
        &self,
        tournament_id: &str,
        participants: usize,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"INSERT INTO "Imports" ("TournamentId", "Participants", "ImportedAt") VALUES (?, ?, ?)"#,
        )
        .bind(tournament_id)
        .bind(participants as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

async fn insert_deck_row<'e, E>(
    executor: E,
    key: &DeckKey,
    counters: &DeckCounters,
) -> Result<Deck, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query_as(
        r#"INSERT INTO "Decks" (
            "PlayerName", "DeckName", "GamesWon", "GamesLost",
            "MatchesWon", "MatchesLost", "MatchesTied", "TournyWins"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *"#,
    )
    .bind(&key.player_name)
    .bind(&key.deck_name)
    .bind(counters.games_won)
    .bind(counters.games_lost)
    .bind(counters.matches_won)
    .bind(counters.matches_lost)
    .bind(counters.matches_tied)
    .bind(counters.tourny_wins)
    .fetch_one(executor)
    .await
}
