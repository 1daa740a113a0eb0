use thiserror::Error;

/// Every failure the reconciler and its clients surface. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    /// Local validation failed: empty query, blank genre, rating out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network or provider failure, timeouts and malformed responses included.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The store already holds a song with this `spotify_id`.
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for LibraryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LibraryError::UpstreamUnavailable(format!("request timed out: {}", e))
        } else if e.is_decode() {
            LibraryError::UpstreamUnavailable(format!("malformed response: {}", e))
        } else {
            LibraryError::UpstreamUnavailable(format!("HTTP request failed: {}", e))
        }
    }
}
