//! Relational stats store.
//!
//! Holds the `Players` and `Decks` aggregate tables plus the `Imports`
//! audit table, backed by SQLite through sqlx.

mod sqlite;

pub use sqlite::*;

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
