use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::catalog::CatalogClient;
use crate::error::LibraryError;
use crate::library::{LibrarySong, NewSong, SongPatch, TrackCandidate};
use crate::persistence::PersistenceClient;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to the library service's REST API: songs CRUD plus the catalog search proxy.
#[derive(Clone)]
pub struct LibraryApiClient {
    client: Client,
    base_url: Url,
}

impl LibraryApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LibraryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LibraryError::InvalidInput(format!("Invalid library URL {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LibraryError::InvalidInput(format!("{} cannot be a base URL", base_url)));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // new() guarantees a base URL, so there are path segments to extend
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, LibraryError> {
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| LibraryError::UpstreamUnavailable(format!("malformed response: {}", e)))
    }
}

/// Maps the service's status codes onto the error taxonomy.
pub fn error_for_status(status: StatusCode, message: String) -> LibraryError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => LibraryError::InvalidInput(message),
        StatusCode::NOT_FOUND => LibraryError::NotFound(message),
        StatusCode::CONFLICT => LibraryError::DuplicateEntry(message),
        _ => LibraryError::UpstreamUnavailable(format!("{}: {}", status, message)),
    }
}

async fn check_status(response: Response) -> Result<Response, LibraryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(error_for_status(status, message))
}

#[async_trait]
impl CatalogClient for LibraryApiClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<TrackCandidate>, LibraryError> {
        debug!("GET spotify/search q={:?} limit={}", query, limit);
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.endpoint(&["spotify", "search"]))
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl PersistenceClient for LibraryApiClient {
    async fn list_songs(&self, genre: Option<&str>) -> Result<Vec<LibrarySong>, LibraryError> {
        debug!("GET songs genre={:?}", genre);
        let mut request = self.client.get(self.endpoint(&["songs"]));
        if let Some(genre) = genre {
            request = request.query(&[("genre", genre)]);
        }
        let response = request.send().await?;
        Self::read_json(response).await
    }

    async fn create_song(&self, song: &NewSong) -> Result<LibrarySong, LibraryError> {
        debug!("POST songs spotify_id={}", song.spotify_id);
        let response = self
            .client
            .post(self.endpoint(&["songs"]))
            .json(song)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn update_song(&self, id: i32, patch: &SongPatch) -> Result<LibrarySong, LibraryError> {
        debug!("PUT songs/{}", id);
        let id = id.to_string();
        let response = self
            .client
            .put(self.endpoint(&["songs", &id]))
            .json(patch)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn delete_song(&self, id: i32) -> Result<(), LibraryError> {
        debug!("DELETE songs/{}", id);
        let id = id.to_string();
        let response = self
            .client
            .delete(self.endpoint(&["songs", &id]))
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}
