//! # Deck Stats
//!
//! Player and deck statistics backend for a trading-card-game community,
//! with tournament result import from Challonge.
//!
//! ## Architecture
//!
//! - **models**: Players, decks, counters and transient bracket data
//! - **storage**: SQLite stats store (`Players`, `Decks`, `Imports`)
//! - **bracket**: Bracket service client and champion detection
//! - **import**: Reconciles bracket results into stored deck counters
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod bracket;
pub mod config;
pub mod import;
pub mod models;
pub mod storage;

pub use models::*;
