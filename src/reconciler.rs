//! Library reconciliation: the single place where user intent (search, filter,
//! import, edit, delete) becomes persisted state, and where derived views
//! (filtered lists, the genre set, stats) are computed.
//!
//! Nothing is cached between calls. Every read goes back to the store, so each
//! `list_songs`/`genres`/`stats` reflects the latest state the store knows of.
//! Concurrent calls are independent; a list racing a delete may or may not
//! include the deleted song.

use std::collections::BTreeSet;

use log::debug;

use crate::catalog::{clamp_limit, CatalogClient, DEFAULT_SEARCH_LIMIT};
use crate::error::LibraryError;
use crate::library::{distinct_genres, Annotation, LibrarySong, LibraryStats, NewSong, SongPatch, TrackCandidate};
use crate::persistence::PersistenceClient;

pub struct Reconciler<C, P> {
    catalog: C,
    store: P,
    search_limit: u32,
}

impl<C: CatalogClient, P: PersistenceClient> Reconciler<C, P> {
    pub fn new(catalog: C, store: P) -> Self {
        Self {
            catalog,
            store,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = clamp_limit(limit);
        self
    }

    /// Blank queries are rejected without contacting the provider.
    pub async fn search(&self, query: &str) -> Result<Vec<TrackCandidate>, LibraryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LibraryError::InvalidInput("Search query is required".to_string()));
        }

        debug!("search {:?}", query);
        self.catalog.search(query, self.search_limit).await
    }

    /// All songs, or only those whose genre equals `genre_filter` exactly. Store order is kept.
    pub async fn list_songs(&self, genre_filter: Option<&str>) -> Result<Vec<LibrarySong>, LibraryError> {
        let genre_filter = genre_filter.filter(|genre| !genre.trim().is_empty());
        self.store.list_songs(genre_filter).await
    }

    pub async fn import_candidate(
        &self,
        candidate: &TrackCandidate,
        annotation: &Annotation,
    ) -> Result<LibrarySong, LibraryError> {
        let new_song = NewSong::from_candidate(candidate, annotation)?;

        debug!("import {} as {:?}", new_song.spotify_id, new_song.genre);
        self.store.create_song(&new_song).await
    }

    /// Applies only the provided fields. Identity fields cannot be patched.
    pub async fn update_song(&self, id: i32, patch: &SongPatch) -> Result<LibrarySong, LibraryError> {
        let patch = patch.validated()?;

        debug!("update song {}", id);
        self.store.update_song(id, &patch).await
    }

    /// A repeated delete surfaces `NotFound`; callers may treat that as success.
    pub async fn delete_song(&self, id: i32) -> Result<(), LibraryError> {
        debug!("delete song {}", id);
        self.store.delete_song(id).await
    }

    pub async fn genres(&self) -> Result<BTreeSet<String>, LibraryError> {
        let songs = self.store.list_songs(None).await?;
        Ok(distinct_genres(&songs))
    }

    pub async fn stats(&self) -> Result<LibraryStats, LibraryError> {
        let songs = self.store.list_songs(None).await?;
        Ok(LibraryStats::from_songs(&songs))
    }
}
