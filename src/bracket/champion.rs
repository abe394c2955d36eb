//! Champion detection.
//!
//! The participants endpoint does not reliably say who won, so the champion
//! is found through a [`ChampionLocator`]. The default locator scrapes the
//! public standings page, which breaks whenever that page's markup changes.
//! [`FinalRankLocator`] reads `final_rank` instead and can replace it without
//! touching the reconciliation logic.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::challonge::{build_http_client, send_checked};
use super::BracketError;
use crate::config::{BracketConfig, ChampionSource};
use crate::models::Participant;

/// Marker for the first-place cell in the standings table.
pub const FIRST_PLACE_MARKER: &str = "<td class='text-center'>1</td>";

/// Bytes of page text after the marker searched for a participant name.
pub const FIRST_PLACE_WINDOW: usize = 150;

/// Capability that decides which participant won a tournament.
#[async_trait]
pub trait ChampionLocator: Send + Sync {
    /// Locator name for logging.
    fn name(&self) -> &'static str;

    /// Participant id of the champion, or `None` when it cannot be determined.
    async fn locate(
        &self,
        tournament_id: &str,
        participants: &[Participant],
    ) -> Result<Option<i64>, BracketError>;
}

/// Build the locator selected in configuration.
pub fn locator_from_config(
    config: &BracketConfig,
) -> Result<Box<dyn ChampionLocator>, BracketError> {
    let locator: Box<dyn ChampionLocator> = match config.champion_source {
        ChampionSource::StandingsPage => Box::new(StandingsPageLocator::new(
            config.site_base.clone(),
            Duration::from_secs(config.timeout_seconds),
        )?),
        ChampionSource::FinalRank => Box::new(FinalRankLocator),
    };
    Ok(locator)
}

/// Scrapes the public tournament page for the first-place row.
pub struct StandingsPageLocator {
    client: Client,
    site_base: String,
}

impl StandingsPageLocator {
    pub fn new(site_base: impl Into<String>, timeout: Duration) -> Result<Self, BracketError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            site_base: site_base.into(),
        })
    }

    fn page_url(&self, tournament_id: &str) -> Result<Url, BracketError> {
        let raw = format!("{}/{}", self.site_base.trim_end_matches('/'), tournament_id);
        Url::parse(&raw).map_err(|e| BracketError::InvalidUrl(format!("{}: {}", raw, e)))
    }
}

#[async_trait]
impl ChampionLocator for StandingsPageLocator {
    fn name(&self) -> &'static str {
        "standings-page"
    }

    async fn locate(
        &self,
        tournament_id: &str,
        participants: &[Participant],
    ) -> Result<Option<i64>, BracketError> {
        let url = self.page_url(tournament_id)?;
        debug!("Fetching standings page {}", url);

        let response = send_checked(self.client.get(url.as_str()), &url).await?;
        let page = response.text().await?;
        Ok(find_champion_in_page(&page, participants))
    }
}

/// Find the champion in a rendered standings page.
///
/// Looks for [`FIRST_PLACE_MARKER`] and searches the following
/// [`FIRST_PLACE_WINDOW`] bytes for participant display names. When several
/// names occur, the earliest one wins, and the longer name breaks a tie at
/// the same position.
pub fn find_champion_in_page(page: &str, participants: &[Participant]) -> Option<i64> {
    let start = page.find(FIRST_PLACE_MARKER)?;

    let mut end = (start + FIRST_PLACE_WINDOW).min(page.len());
    while !page.is_char_boundary(end) {
        end -= 1;
    }
    let window = &page[start..end];

    participants
        .iter()
        .filter(|p| !p.name.is_empty())
        .filter_map(|p| window.find(&p.name).map(|pos| (pos, p)))
        .min_by(|(pos_a, a), (pos_b, b)| pos_a.cmp(pos_b).then(b.name.len().cmp(&a.name.len())))
        .map(|(_, p)| p.id)
}

/// Uses the `final_rank` reported for finalized tournaments.
pub struct FinalRankLocator;

#[async_trait]
impl ChampionLocator for FinalRankLocator {
    fn name(&self) -> &'static str {
        "final-rank"
    }

    async fn locate(
        &self,
        _tournament_id: &str,
        participants: &[Participant],
    ) -> Result<Option<i64>, BracketError> {
        Ok(participants
            .iter()
            .find(|p| p.final_rank == Some(1))
            .map(|p| p.id))
    }
}

/// Locator returning a fixed answer, for tests.
#[cfg(test)]
pub struct FixedChampion(pub Option<i64>);

#[cfg(test)]
#[async_trait]
impl ChampionLocator for FixedChampion {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn locate(
        &self,
        _tournament_id: &str,
        _participants: &[Participant],
    ) -> Result<Option<i64>, BracketError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participants() -> Vec<Participant> {
        vec![
            Participant::new(1, "Alice - Dragons"),
            Participant::new(2, "Bob - Plants"),
        ]
    }

    fn standings_page(first: &str, second: &str) -> String {
        format!(
            "<html><table>\
             <tr><td class='text-center'>1</td><td><span>{}</span></td></tr>\
             <tr><td class='text-center'>2</td><td><span>{}</span></td></tr>\
             </table></html>",
            first, second
        )
    }

    #[test]
    fn test_finds_first_place() {
        let page = standings_page("Bob - Plants", "Alice - Dragons");
        assert_eq!(find_champion_in_page(&page, &participants()), Some(2));
    }

    #[test]
    fn test_no_marker() {
        let page = "<html><p>Tournament not started</p></html>";
        assert_eq!(find_champion_in_page(page, &participants()), None);
    }

    #[test]
    fn test_name_outside_window_ignored() {
        let padding = "x".repeat(FIRST_PLACE_WINDOW);
        let page = format!("{}{}Alice - Dragons", FIRST_PLACE_MARKER, padding);
        assert_eq!(find_champion_in_page(&page, &participants()), None);
    }

    #[test]
    fn test_earliest_name_wins_with_longer_on_tie() {
        let people = vec![
            Participant::new(1, "Al - X"),
            Participant::new(2, "Al - Xyz"),
            Participant::new(3, "Zed - Q"),
        ];
        let page = format!("{}<td>Al - Xyz</td><td>Zed - Q</td>", FIRST_PLACE_MARKER);
        assert_eq!(find_champion_in_page(&page, &people), Some(2));
    }

    #[test]
    fn test_window_respects_char_boundaries() {
        // Multi-byte characters straddling the window edge must not panic
        let filler = format!("a{}", "é".repeat(FIRST_PLACE_WINDOW));
        let page = format!("{}{}", FIRST_PLACE_MARKER, filler);
        assert_eq!(find_champion_in_page(&page, &participants()), None);
    }

    #[tokio::test]
    async fn test_final_rank_locator() {
        let mut people = participants();
        people[1].final_rank = Some(1);
        people[0].final_rank = Some(2);

        let found = FinalRankLocator.locate("t", &people).await.unwrap();
        assert_eq!(found, Some(2));
    }

    #[tokio::test]
    async fn test_final_rank_locator_unfinished() {
        let found = FinalRankLocator.locate("t", &participants()).await.unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_page_url() {
        let locator =
            StandingsPageLocator::new("https://challonge.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            locator.page_url("locals42").unwrap().as_str(),
            "https://challonge.com/locals42"
        );
    }

    #[test]
    fn test_locator_from_config() {
        let mut config = BracketConfig::default();
        assert_eq!(locator_from_config(&config).unwrap().name(), "standings-page");

        config.champion_source = ChampionSource::FinalRank;
        assert_eq!(locator_from_config(&config).unwrap().name(), "final-rank");
    }
}
