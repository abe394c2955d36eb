//! Challonge v1 REST API client.
//!
//! Participants and matches come back as arrays of single-key envelopes
//! (`[{"participant": {...}}]`, `[{"match": {...}}]`) and the API uses HTTP
//! basic auth with the account username and API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use super::{BracketError, BracketSource};
use crate::config::BracketConfig;
use crate::models::{Match, MatchEnvelope, Participant, ParticipantEnvelope};

const DEFAULT_USER_AGENT: &str = concat!("deck-stats/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by the API client and the page scraper.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, BracketError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

    Ok(Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()?)
}

/// Send a request and turn non-success statuses into errors.
pub(crate) async fn send_checked(
    request: RequestBuilder,
    url: &Url,
) -> Result<Response, BracketError> {
    let response = request.send().await?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        return Err(BracketError::RateLimited {
            host: url.host_str().unwrap_or("unknown").to_string(),
            retry_after_secs: retry_after,
        });
    }

    if !status.is_success() {
        return Err(BracketError::HttpStatus {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    Ok(response)
}

/// Challonge API client.
pub struct ChallongeClient {
    client: Client,
    api_base: String,
    username: Option<String>,
    api_key: Option<String>,
}

impl ChallongeClient {
    pub fn new(
        api_base: impl Into<String>,
        username: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BracketError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_base: api_base.into(),
            username,
            api_key,
        })
    }

    /// Create a client from configuration, resolving credentials from the environment.
    pub fn from_config(config: &BracketConfig) -> Result<Self, BracketError> {
        let username = config.resolve_username();
        let api_key = config.resolve_api_key();
        if username.is_none() || api_key.is_none() {
            warn!(
                "Challonge credentials incomplete (username set: {}, {} set: {}); imports will likely be rejected",
                username.is_some(),
                config.api_key_env,
                api_key.is_some()
            );
        }

        Self::new(
            config.api_base.clone(),
            username,
            api_key,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    /// URL of a tournament resource, e.g. `participants.json`.
    fn resource_url(&self, tournament_id: &str, resource: &str) -> Result<Url, BracketError> {
        let raw = format!(
            "{}/tournaments/{}/{}",
            self.api_base.trim_end_matches('/'),
            tournament_id,
            resource
        );
        Url::parse(&raw).map_err(|e| BracketError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url) -> Result<T, BracketError> {
        debug!("GET {}", url);

        let mut request = self.client.get(url.as_str());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.api_key.as_deref());
        }

        let response = send_checked(request, url).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl BracketSource for ChallongeClient {
    fn name(&self) -> &'static str {
        "challonge"
    }

    async fn participants(&self, tournament_id: &str) -> Result<Vec<Participant>, BracketError> {
        let url = self.resource_url(tournament_id, "participants.json")?;
        let envelopes: Vec<ParticipantEnvelope> = self.get_json(&url).await?;

        info!(
            "Challonge: {} participants in {}",
            envelopes.len(),
            tournament_id
        );
        Ok(envelopes.into_iter().map(|e| e.participant).collect())
    }

    async fn matches(&self, tournament_id: &str) -> Result<Vec<Match>, BracketError> {
        let url = self.resource_url(tournament_id, "matches.json")?;
        let envelopes: Vec<MatchEnvelope> = self.get_json(&url).await?;

        info!("Challonge: {} matches in {}", envelopes.len(), tournament_id);
        Ok(envelopes.into_iter().map(|e| e.match_).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client(api_base: &str) -> ChallongeClient {
        ChallongeClient::new(api_base, None, None, Duration::from_secs(5)).unwrap()
    }

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    async fn fetch(response: &'static str) -> Result<Response, BracketError> {
        let url = serve_once(response).await;
        let client = build_http_client(Duration::from_secs(5)).unwrap();
        send_checked(client.get(url.as_str()), &url).await
    }

    #[tokio::test]
    async fn test_send_checked_rate_limited() {
        let result = fetch(
            "HTTP/1.1 429 Too Many Requests\r\nretry-after: 17\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        match result {
            Err(BracketError::RateLimited {
                host,
                retry_after_secs,
            }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(retry_after_secs, 17);
            }
            other => panic!("expected RateLimited, got {:?}", other.map(|r| r.status())),
        }
    }

    #[tokio::test]
    async fn test_send_checked_rate_limited_default_retry() {
        let result = fetch(
            "HTTP/1.1 429 Too Many Requests\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        assert!(matches!(
            result,
            Err(BracketError::RateLimited {
                retry_after_secs: 60,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_send_checked_error_status() {
        let result = fetch(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        match result {
            Err(BracketError::HttpStatus { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("expected HttpStatus, got {:?}", other.map(|r| r.status())),
        }
    }

    #[tokio::test]
    async fn test_send_checked_success() {
        let response = fetch(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n[]",
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "[]");
    }

    #[test]
    fn test_resource_url() {
        let client = client("https://api.challonge.com/v1");
        let url = client.resource_url("locals42", "matches.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.challonge.com/v1/tournaments/locals42/matches.json"
        );
    }

    #[test]
    fn test_resource_url_trailing_slash() {
        let client = client("https://api.challonge.com/v1/");
        let url = client.resource_url("ygo-weekly7", "participants.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.challonge.com/v1/tournaments/ygo-weekly7/participants.json"
        );
    }

    #[test]
    fn test_resource_url_invalid_base() {
        let client = client("not a url");
        assert!(matches!(
            client.resource_url("x", "matches.json"),
            Err(BracketError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_from_config_without_credentials() {
        let config = BracketConfig {
            api_key_env: "DECK_STATS_TEST_UNSET_KEY".to_string(),
            ..Default::default()
        };
        let client = ChallongeClient::from_config(&config).unwrap();
        assert!(client.api_key.is_none());
        assert_eq!(client.name(), "challonge");
    }
}
