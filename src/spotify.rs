use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::catalog::{clamp_limit, CatalogClient};
use crate::config::Config;
use crate::error::LibraryError;
use crate::library::TrackCandidate;

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

// Tokens are refreshed this long before Spotify says they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// Spotify Web API status codes as per documentation
const SPOTIFY_BAD_REQUEST: u16 = 400;
const SPOTIFY_UNAUTHORIZED: u16 = 401;
const SPOTIFY_FORBIDDEN: u16 = 403;
const SPOTIFY_NOT_FOUND: u16 = 404;
const SPOTIFY_TOO_MANY_REQUESTS: u16 = 429;
const SPOTIFY_INTERNAL_ERROR: u16 = 500;
const SPOTIFY_BAD_GATEWAY: u16 = 502;
const SPOTIFY_SERVICE_UNAVAILABLE: u16 = 503;

#[derive(Deserialize)]
struct SpotifyTokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyErrorResponse {
    error: SpotifyErrorBody,
}

#[derive(Deserialize)]
struct SpotifyErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct SpotifySearchResponse {
    tracks: Option<SpotifyPaging>,
}

#[derive(Deserialize)]
struct SpotifyPaging {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: SpotifyAlbum,
    preview_url: Option<String>,
    #[serde(default)]
    duration_ms: i32,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Deserialize)]
struct SpotifyAlbum {
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
    release_date: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyImage {
    url: String,
}

impl From<SpotifyTrack> for TrackCandidate {
    fn from(track: SpotifyTrack) -> Self {
        let artist = track
            .artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: track.id,
            title: track.name,
            artist,
            album: track.album.name,
            image_url: track.album.images.into_iter().next().map(|image| image.url).unwrap_or_default(),
            preview_url: track.preview_url.unwrap_or_default(),
            release_date: track.album.release_date.unwrap_or_default(),
            duration: track.duration_ms,
        }
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

/// Spotify Web API client using the client-credentials flow.
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    api_url: String,
    token_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String, timeout: Duration) -> Result<Self, LibraryError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            client_id,
            client_secret,
            api_url: SPOTIFY_API_URL.to_string(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Returns `None` when credentials are missing, in which case search is unavailable.
    pub fn from_config(config: &Config) -> Result<Option<Self>, LibraryError> {
        match config.spotify_credentials() {
            Some((client_id, client_secret)) => {
                Self::new(client_id, client_secret, config.request_timeout).map(Some)
            }
            None => {
                warn!("Spotify credentials not set. Search functionality will be unavailable.");
                Ok(None)
            }
        }
    }

    /// Points the client at other endpoints, e.g. a local stand-in.
    pub fn with_endpoints(mut self, api_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.token_url = token_url.into();
        self
    }

    async fn access_token(&self) -> Result<String, LibraryError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref().filter(|current| current.is_fresh()) {
            return Ok(current.value.clone());
        }

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn request_token(&self) -> Result<AccessToken, LibraryError> {
        debug!("Requesting Spotify access token");

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        let token_response: SpotifyTokenResponse = response.json().await.map_err(|e| {
            LibraryError::UpstreamUnavailable(format!("Failed to parse token response: {}", e))
        })?;

        if let Some(error) = token_response.error {
            return Err(LibraryError::UpstreamUnavailable(format!(
                "Spotify token error {}: {} - {}",
                status.as_u16(),
                error,
                token_response.error_description.unwrap_or_default()
            )));
        }

        let value = token_response
            .access_token
            .ok_or_else(|| LibraryError::UpstreamUnavailable("No access token in response".to_string()))?;
        let expires_in = Duration::from_secs(token_response.expires_in.unwrap_or(3600));

        Ok(AccessToken {
            value,
            expires_at: Instant::now() + expires_in,
        })
    }

    async fn send_search(&self, token: &str, query: &str, limit: u32) -> Result<Response, LibraryError> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.api_url))
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await?;
        Ok(response)
    }

    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<TrackCandidate>, LibraryError> {
        let limit = clamp_limit(limit);
        debug!("Searching Spotify for {:?} (limit {})", query, limit);

        let token = self.access_token().await?;
        let mut response = self.send_search(&token, query, limit).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Spotify rejected the cached token, requesting a new one");
            self.invalidate_token().await;
            let token = self.access_token().await?;
            response = self.send_search(&token, query, limit).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<SpotifyErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_default();
            return Err(LibraryError::UpstreamUnavailable(format!(
                "Spotify API error {}: {} - {}",
                status.as_u16(),
                describe_status(status.as_u16()),
                message
            )));
        }

        let search_response: SpotifySearchResponse = response.json().await.map_err(|e| {
            LibraryError::UpstreamUnavailable(format!("Failed to parse search response: {}", e))
        })?;

        let tracks: Vec<TrackCandidate> = search_response
            .tracks
            .map(|paging| paging.items)
            .unwrap_or_default()
            .into_iter()
            .map(TrackCandidate::from)
            .collect();

        debug!("Spotify returned {} tracks for {:?}", tracks.len(), query);
        Ok(tracks)
    }
}

#[async_trait]
impl CatalogClient for SpotifyClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<TrackCandidate>, LibraryError> {
        self.search_tracks(query, limit).await
    }
}

fn describe_status(status: u16) -> &'static str {
    match status {
        SPOTIFY_BAD_REQUEST => "Bad request - The request could not be understood",
        SPOTIFY_UNAUTHORIZED => "Unauthorized - Bad or expired token",
        SPOTIFY_FORBIDDEN => "Forbidden - The client credentials were refused",
        SPOTIFY_NOT_FOUND => "Not found - The requested resource could not be found",
        SPOTIFY_TOO_MANY_REQUESTS => "Rate limit exceeded - Too many requests in a short period",
        SPOTIFY_INTERNAL_ERROR => "Internal server error - Please try again later",
        SPOTIFY_BAD_GATEWAY => "Bad gateway - The upstream server returned an invalid response",
        SPOTIFY_SERVICE_UNAVAILABLE => "Service unavailable - Spotify is temporarily offline",
        _ => "Unknown error",
    }
}
