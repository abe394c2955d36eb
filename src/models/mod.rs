//! Core data models for the stats store and tournament imports.

mod bracket;
mod deck;
mod player;

pub use bracket::*;
pub use deck::*;
pub use player::*;
