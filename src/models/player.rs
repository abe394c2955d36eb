//! Player model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored player row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Player {
    #[sqlx(rename = "ID")]
    pub id: i64,

    #[sqlx(rename = "Name")]
    pub name: String,

    #[sqlx(rename = "Wins")]
    pub wins: i64,
}

/// Request body for creating a player.
///
/// Any `id` supplied by the client is ignored; the database assigns one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlayer {
    pub name: String,

    #[serde(default)]
    pub wins: i64,
}
