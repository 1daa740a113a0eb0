use async_trait::async_trait;

use crate::error::LibraryError;
use crate::library::TrackCandidate;

/// Default number of candidates asked for per search.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
/// Largest page the Spotify search endpoint accepts.
pub const MAX_SEARCH_LIMIT: u32 = 50;

pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_SEARCH_LIMIT)
}

/// Parses a caller-supplied limit. Out-of-range numbers are clamped, anything
/// that is not an integer yields `None`.
pub fn parse_limit(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .map(|limit| limit.clamp(1, MAX_SEARCH_LIMIT as i64) as u32)
}

/// Free-text search over an external music catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<TrackCandidate>, LibraryError>;
}
