//! Tournament bracket service access.
//!
//! The importer only talks to the bracket service through the
//! [`BracketSource`] and [`ChampionLocator`] traits. Challonge specifics live
//! in [`challonge`] and [`champion`].

pub mod challonge;
pub mod champion;

pub use challonge::ChallongeClient;
pub use champion::{locator_from_config, ChampionLocator, FinalRankLocator, StandingsPageLocator};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Match, Participant};

/// Errors that can occur while talking to the bracket service.
#[derive(Debug, Error)]
pub enum BracketError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only access to a tournament's participants and matches.
#[async_trait]
pub trait BracketSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    async fn participants(&self, tournament_id: &str) -> Result<Vec<Participant>, BracketError>;

    async fn matches(&self, tournament_id: &str) -> Result<Vec<Match>, BracketError>;
}

/// Extract the tournament id from a bracket link.
///
/// The id is the path segment right after the host, so both
/// `challonge.com/abc123` and `https://challonge.com/abc123/standings`
/// yield `abc123`. Community subdomains are folded into the id the way the
/// API expects: `https://team.challonge.com/weekly` yields `team-weekly`.
pub fn tournament_id_from_link(link: &str) -> Option<String> {
    let trimmed = link.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);

    let mut segments = without_scheme.split('/');
    let host = segments.next()?;
    let slug = segments.next()?;
    let slug = slug.split(['?', '#']).next().unwrap_or_default().trim();
    if slug.is_empty() {
        return None;
    }

    let host = host.to_lowercase();
    match host.strip_suffix(".challonge.com") {
        Some(sub) if sub != "www" && !sub.is_empty() => Some(format!("{}-{}", sub, slug)),
        _ => Some(slug.to_string()),
    }
}

/// In-memory bracket for tests.
#[cfg(test)]
pub struct StaticBracket {
    pub participants: Vec<Participant>,
    pub matches: Vec<Match>,
}

#[cfg(test)]
#[async_trait]
impl BracketSource for StaticBracket {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn participants(&self, _tournament_id: &str) -> Result<Vec<Participant>, BracketError> {
        Ok(self.participants.clone())
    }

    async fn matches(&self, _tournament_id: &str) -> Result<Vec<Match>, BracketError> {
        Ok(self.matches.clone())
    }
}
