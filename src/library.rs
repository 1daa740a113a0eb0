use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

pub const MIN_RATING: i32 = 0;
pub const MAX_RATING: i32 = 10;

/// A search result from the external catalog. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCandidate {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub preview_url: String,
    #[serde(default)]
    pub release_date: String,
    /// Milliseconds.
    #[serde(default)]
    pub duration: i32,
}

/// A persisted, user-annotated entry in the local collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySong {
    pub id: i32,
    pub spotify_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub image_url: String,
    pub preview_url: String,
    pub rating: i32,
    #[serde(default)]
    pub summary: String,
    pub release_date: String,
    pub duration: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<entity::song::Model> for LibrarySong {
    fn from(model: entity::song::Model) -> Self {
        Self {
            id: model.id,
            spotify_id: model.spotify_id,
            title: model.title,
            artist: model.artist,
            album: model.album,
            genre: model.genre,
            image_url: model.image_url,
            preview_url: model.preview_url,
            rating: model.rating,
            summary: model.summary,
            release_date: model.release_date,
            duration: model.duration,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// What the user adds to a candidate when importing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub genre: String,
    pub rating: i32,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Body of a create request: a library song without store-assigned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSong {
    pub spotify_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub preview_url: String,
    pub rating: i32,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub duration: i32,
}

impl NewSong {
    /// Validates the annotation and merges it with the candidate's catalog fields.
    pub fn from_candidate(candidate: &TrackCandidate, annotation: &Annotation) -> Result<Self, LibraryError> {
        let genre = validate_genre(&annotation.genre)?;
        validate_rating(annotation.rating)?;

        Ok(Self {
            spotify_id: candidate.id.clone(),
            title: candidate.title.clone(),
            artist: candidate.artist.clone(),
            album: candidate.album.clone(),
            genre,
            image_url: candidate.image_url.clone(),
            preview_url: candidate.preview_url.clone(),
            rating: annotation.rating,
            summary: annotation.summary.clone().unwrap_or_default(),
            release_date: candidate.release_date.clone(),
            duration: candidate.duration,
        })
    }

    /// Checks a create body that arrived from outside the reconciler.
    pub fn validate(&self) -> Result<(), LibraryError> {
        if self.spotify_id.trim().is_empty() {
            return Err(LibraryError::InvalidInput("spotify_id is required".to_string()));
        }
        validate_genre(&self.genre)?;
        validate_rating(self.rating)
    }
}

/// Partial edit of a library song. Identity fields have no place here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl SongPatch {
    /// Validates the provided fields and returns the patch with its genre trimmed.
    pub fn validated(&self) -> Result<Self, LibraryError> {
        let genre = match &self.genre {
            Some(genre) => Some(validate_genre(genre)?),
            None => None,
        };
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }

        Ok(Self {
            genre,
            rating: self.rating,
            summary: self.summary.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.rating.is_none() && self.summary.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_songs: u64,
    pub average_rating: f64,
    pub genres: Vec<String>,
    #[serde(default)]
    pub genre_counts: Vec<GenreCount>,
}

impl LibraryStats {
    pub fn from_songs(songs: &[LibrarySong]) -> Self {
        let rating_sum: i64 = songs.iter().map(|song| i64::from(song.rating)).sum();

        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for song in songs {
            *counts.entry(song.genre.as_str()).or_default() += 1;
        }
        let genre_counts = counts
            .into_iter()
            .map(|(genre, count)| GenreCount { genre: genre.to_string(), count })
            .collect();

        Self::from_aggregates(songs.len() as u64, rating_sum, genre_counts)
    }

    /// Builds stats from pre-aggregated values, e.g. the result of SQL `COUNT`/`SUM`/`GROUP BY`.
    pub fn from_aggregates(total_songs: u64, rating_sum: i64, genre_counts: Vec<GenreCount>) -> Self {
        let average_rating = if total_songs == 0 {
            0.0
        } else {
            rating_sum as f64 / total_songs as f64
        };

        let mut genre_counts: Vec<GenreCount> = genre_counts
            .into_iter()
            .filter(|entry| !entry.genre.is_empty())
            .collect();
        genre_counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));

        let genres = genre_counts
            .iter()
            .map(|entry| entry.genre.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            total_songs,
            average_rating,
            genres,
            genre_counts,
        }
    }
}

/// The distinct, non-empty genres present across `songs`.
pub fn distinct_genres(songs: &[LibrarySong]) -> BTreeSet<String> {
    songs
        .iter()
        .filter(|song| !song.genre.is_empty())
        .map(|song| song.genre.clone())
        .collect()
}

pub fn validate_rating(rating: i32) -> Result<(), LibraryError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(LibraryError::InvalidInput(format!(
            "Rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )))
    }
}

/// Returns the trimmed genre, rejecting blank input.
pub fn validate_genre(genre: &str) -> Result<String, LibraryError> {
    let genre = genre.trim();
    if genre.is_empty() {
        return Err(LibraryError::InvalidInput("Genre is required".to_string()));
    }
    Ok(genre.to_string())
}
