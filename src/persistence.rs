use async_trait::async_trait;

use crate::error::LibraryError;
use crate::library::{LibrarySong, NewSong, SongPatch};

/// CRUD over the songs collection. The store is the only arbiter of `spotify_id` uniqueness.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// `genre` is an exact, case-sensitive filter.
    async fn list_songs(&self, genre: Option<&str>) -> Result<Vec<LibrarySong>, LibraryError>;

    async fn create_song(&self, song: &NewSong) -> Result<LibrarySong, LibraryError>;

    async fn update_song(&self, id: i32, patch: &SongPatch) -> Result<LibrarySong, LibraryError>;

    async fn delete_song(&self, id: i32) -> Result<(), LibraryError>;
}
