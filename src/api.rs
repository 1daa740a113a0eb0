use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use log::{error, warn};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use entity::prelude::Song;
use entity::song;

use crate::catalog::{clamp_limit, parse_limit, CatalogClient, DEFAULT_SEARCH_LIMIT};
use crate::error::LibraryError;
use crate::library::{validate_genre, GenreCount, LibrarySong, LibraryStats, NewSong, SongPatch, TrackCandidate};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub catalog: Option<Arc<dyn CatalogClient>>,
    pub search_limit: u32,
}

impl AppState {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            catalog: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogClient>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = clamp_limit(limit);
        self
    }
}

/// An HTTP error rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Extractor failures keep axum's status but answer with the JSON body.
    fn rejected(status: StatusCode, message: String) -> Self {
        warn!("Rejected request: {}", message);
        Self::new(status, message)
    }

    fn song_not_found(id: i32) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Song {} not found", id))
    }
}

impl From<LibraryError> for ApiError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::InvalidInput(message) => Self::new(StatusCode::BAD_REQUEST, message),
            LibraryError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            LibraryError::DuplicateEntry(message) => Self::new(StatusCode::CONFLICT, message),
            LibraryError::UpstreamUnavailable(message) => Self::new(StatusCode::BAD_GATEWAY, message),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(e: DbErr) -> Self {
        error!("Database error: {}", e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
pub struct SongQuery {
    pub genre: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/songs", get(get_songs).post(create_song))
        .route("/songs/:id", get(get_song_by_id).put(update_song).delete(delete_song))
        .route("/spotify/search", get(search_spotify))
        .route("/genres", get(get_genres))
        .route("/stats", get(get_stats));

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .with_state(state)
}

/// CORS for the configured browser origins. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
}

// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// GET /api/songs - List songs in creation order, optionally filtered by exact genre
async fn get_songs(
    State(state): State<AppState>,
    params: Result<Query<SongQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LibrarySong>>> {
    let Query(params) = params?;
    let mut query = Song::find();

    if let Some(genre) = params.genre.filter(|genre| !genre.is_empty()) {
        query = query.filter(song::Column::Genre.eq(genre));
    }

    let songs = query
        .order_by_asc(song::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(LibrarySong::from)
        .collect();

    Ok(Json(songs))
}

// GET /api/songs/:id - Get a specific song by ID
async fn get_song_by_id(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<LibrarySong>> {
    let Path(id) = id?;
    match Song::find_by_id(id).one(&state.db).await? {
        Some(song) => Ok(Json(LibrarySong::from(song))),
        None => Err(ApiError::song_not_found(id)),
    }
}

// POST /api/songs - Add a song; spotify_id must not exist yet
async fn create_song(
    State(state): State<AppState>,
    new_song: Result<Json<NewSong>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<LibrarySong>)> {
    let Json(new_song) = new_song?;
    new_song.validate()?;
    let genre = validate_genre(&new_song.genre)?;

    let existing = Song::find()
        .filter(song::Column::SpotifyId.eq(&new_song.spotify_id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(duplicate(&new_song.spotify_id));
    }

    let now = Utc::now();
    let model = song::ActiveModel {
        id: NotSet,
        spotify_id: Set(new_song.spotify_id.clone()),
        title: Set(new_song.title),
        artist: Set(new_song.artist),
        album: Set(new_song.album),
        genre: Set(genre),
        image_url: Set(new_song.image_url),
        preview_url: Set(new_song.preview_url),
        rating: Set(new_song.rating),
        summary: Set(new_song.summary),
        release_date: Set(new_song.release_date),
        duration: Set(new_song.duration),
        created_at: Set(now),
        updated_at: Set(now),
    };

    // A concurrent insert can still slip past the lookup above; the unique index catches it
    match model.insert(&state.db).await {
        Ok(song) => Ok((StatusCode::CREATED, Json(LibrarySong::from(song)))),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(duplicate(&new_song.spotify_id))
        }
        Err(e) => Err(e.into()),
    }
}

fn duplicate(spotify_id: &str) -> ApiError {
    warn!("Rejected duplicate import of {}", spotify_id);
    ApiError::from(LibraryError::DuplicateEntry(format!(
        "Song with spotify_id {} already exists",
        spotify_id
    )))
}

// PUT /api/songs/:id - Update genre, rating and/or summary
async fn update_song(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    patch: Result<Json<SongPatch>, JsonRejection>,
) -> ApiResult<Json<LibrarySong>> {
    let Path(id) = id?;
    let Json(patch) = patch?;
    let patch = patch.validated()?;

    let existing = Song::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::song_not_found(id))?;
    if patch.is_empty() {
        return Ok(Json(LibrarySong::from(existing)));
    }

    let mut model: song::ActiveModel = existing.into();
    if let Some(genre) = patch.genre {
        model.genre = Set(genre);
    }
    if let Some(rating) = patch.rating {
        model.rating = Set(rating);
    }
    if let Some(summary) = patch.summary {
        model.summary = Set(summary);
    }
    model.updated_at = Set(Utc::now());

    let updated = model.update(&state.db).await?;
    Ok(Json(LibrarySong::from(updated)))
}

// DELETE /api/songs/:id
async fn delete_song(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = id?;
    let result = Song::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::song_not_found(id));
    }

    Ok(Json(MessageResponse {
        message: "Song deleted successfully".to_string(),
    }))
}

// GET /api/spotify/search - Proxy a track search to the catalog
async fn search_spotify(
    State(state): State<AppState>,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TrackCandidate>>> {
    let Query(params) = params?;
    let query = params.q.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Query parameter 'q' is required"));
    }

    let catalog = state.catalog.as_ref().ok_or_else(|| {
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Spotify client not initialized")
    })?;

    // An unparseable limit falls back to the configured default
    let limit = params
        .limit
        .as_deref()
        .and_then(parse_limit)
        .unwrap_or_else(|| clamp_limit(state.search_limit));
    match catalog.search(query, limit).await {
        Ok(tracks) => Ok(Json(tracks)),
        Err(e) => {
            error!("Catalog search for {:?} failed: {}", query, e);
            Err(e.into())
        }
    }
}

// GET /api/genres - Get list of unique genres
async fn get_genres(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<String>>> {
    let genres: Vec<String> = Song::find()
        .select_only()
        .column(song::Column::Genre)
        .distinct()
        .filter(song::Column::Genre.ne(""))
        .order_by_asc(song::Column::Genre)
        .into_tuple()
        .all(&state.db)
        .await?;

    Ok(Json(genres))
}

// GET /api/stats - Aggregate statistics about the library
async fn get_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<LibraryStats>> {
    let total_songs = Song::find().count(&state.db).await?;

    let rating_sum: Option<i64> = Song::find()
        .select_only()
        .column_as(song::Column::Rating.sum(), "rating_sum")
        .into_tuple::<Option<i64>>()
        .one(&state.db)
        .await?
        .flatten();

    let genre_counts: Vec<(String, i64)> = Song::find()
        .select_only()
        .column(song::Column::Genre)
        .column_as(song::Column::Id.count(), "count")
        .group_by(song::Column::Genre)
        .into_tuple()
        .all(&state.db)
        .await?;

    let genre_counts = genre_counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre,
            count: count.max(0) as u64,
        })
        .collect();

    Ok(Json(LibraryStats::from_aggregates(
        total_songs,
        rating_sum.unwrap_or(0),
        genre_counts,
    )))
}
