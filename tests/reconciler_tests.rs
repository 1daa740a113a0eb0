//! End-to-end reconciliation: `Reconciler` -> `LibraryApiClient` -> real router over HTTP.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{candidate, setup_test_db, spawn_server, stub_state, StubCatalog};
use songbook_server::api::AppState;
use songbook_server::catalog::CatalogClient;
use songbook_server::error::LibraryError;
use songbook_server::http_client::LibraryApiClient;
use songbook_server::library::{Annotation, SongPatch};
use songbook_server::reconciler::Reconciler;

type HttpReconciler = Reconciler<LibraryApiClient, LibraryApiClient>;

async fn setup(catalog: Arc<StubCatalog>) -> HttpReconciler {
    let (_, base_url) = spawn_server(stub_state(setup_test_db().await, catalog)).await;
    let client = LibraryApiClient::new(&base_url, Duration::from_secs(5)).unwrap();
    Reconciler::new(client.clone(), client)
}

fn annotation(genre: &str, rating: i32, summary: Option<&str>) -> Annotation {
    Annotation {
        genre: genre.to_string(),
        rating,
        summary: summary.map(str::to_string),
    }
}

#[tokio::test]
async fn test_search_import_filter_scenario() {
    let catalog = Arc::new(StubCatalog::with_results(vec![candidate("t1", "Rain")]));
    let reconciler = setup(catalog).await;

    let candidates = reconciler.search("lofi").await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, "t1");
    assert_eq!(candidates[0].title, "Rain");

    let song = reconciler
        .import_candidate(&candidates[0], &annotation("Chill", 7, Some("nice")))
        .await
        .unwrap();
    assert_eq!(song.spotify_id, "t1");
    assert_eq!(song.genre, "Chill");
    assert_eq!(song.rating, 7);
    assert_eq!(song.summary, "nice");
    assert_eq!(song.album, "Clouds");

    assert_eq!(reconciler.list_songs(Some("Chill")).await.unwrap(), vec![song.clone()]);
    assert!(reconciler.list_songs(Some("Rock")).await.unwrap().is_empty());

    let all = reconciler.list_songs(None).await.unwrap();
    assert_eq!(all.iter().filter(|s| s.spotify_id == "t1").count(), 1);
}

#[tokio::test]
async fn test_double_import_is_duplicate_entry() {
    let reconciler = setup(Arc::new(StubCatalog::default())).await;
    let rain = candidate("t1", "Rain");

    reconciler.import_candidate(&rain, &annotation("Chill", 7, None)).await.unwrap();
    let second = reconciler.import_candidate(&rain, &annotation("Chill", 7, None)).await;

    assert!(matches!(second, Err(LibraryError::DuplicateEntry(_))));
    assert_eq!(reconciler.list_songs(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_only_changes_patched_fields() {
    let reconciler = setup(Arc::new(StubCatalog::default())).await;
    let before = reconciler
        .import_candidate(&candidate("t1", "Rain"), &annotation("Chill", 5, Some("nice")))
        .await
        .unwrap();

    let after = reconciler
        .update_song(before.id, &SongPatch { rating: Some(9), ..Default::default() })
        .await
        .unwrap();

    assert_eq!(after.rating, 9);
    assert_eq!(after.title, before.title);
    assert_eq!(after.artist, before.artist);
    assert_eq!(after.spotify_id, before.spotify_id);
    assert_eq!(after.genre, before.genre);
    assert_eq!(after.summary, before.summary);
    assert_eq!(after.created_at, before.created_at);

    let missing = reconciler
        .update_song(before.id + 100, &SongPatch { rating: Some(1), ..Default::default() })
        .await;
    assert!(matches!(missing, Err(LibraryError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_ratings_leave_store_unchanged() {
    let reconciler = setup(Arc::new(StubCatalog::default())).await;
    let song = reconciler
        .import_candidate(&candidate("t1", "Rain"), &annotation("Chill", 5, None))
        .await
        .unwrap();

    for rating in [-1, 11, 100] {
        let import = reconciler
            .import_candidate(&candidate("t2", "Storm"), &annotation("Chill", rating, None))
            .await;
        assert!(matches!(import, Err(LibraryError::InvalidInput(_))));

        let update = reconciler
            .update_song(song.id, &SongPatch { rating: Some(rating), ..Default::default() })
            .await;
        assert!(matches!(update, Err(LibraryError::InvalidInput(_))));
    }

    assert_eq!(reconciler.list_songs(None).await.unwrap(), vec![song]);
}

#[tokio::test]
async fn test_delete_and_derived_views() {
    let reconciler = setup(Arc::new(StubCatalog::default())).await;

    let empty = reconciler.stats().await.unwrap();
    assert_eq!(empty.total_songs, 0);
    assert_eq!(empty.average_rating, 0.0);
    assert!(empty.genres.is_empty());

    reconciler.import_candidate(&candidate("a", "A"), &annotation("Rock", 4, None)).await.unwrap();
    let jazz = reconciler.import_candidate(&candidate("b", "B"), &annotation("Jazz", 9, None)).await.unwrap();

    let stats = reconciler.stats().await.unwrap();
    assert_eq!(stats.total_songs, 2);
    assert_eq!(stats.average_rating, 6.5);
    assert_eq!(stats.genres, vec!["Jazz", "Rock"]);

    reconciler.delete_song(jazz.id).await.unwrap();
    assert!(matches!(reconciler.delete_song(jazz.id).await, Err(LibraryError::NotFound(_))));

    let genres: Vec<String> = reconciler.genres().await.unwrap().into_iter().collect();
    assert_eq!(genres, vec!["Rock"]);
}

#[tokio::test]
async fn test_catalog_failures_surface_as_upstream_unavailable() {
    let reconciler = setup(Arc::new(StubCatalog::failing())).await;
    assert!(matches!(reconciler.search("lofi").await, Err(LibraryError::UpstreamUnavailable(_))));

    // The service answers 503 when no catalog is configured at all
    let (_, base_url) = spawn_server(AppState::new(setup_test_db().await)).await;
    let client = LibraryApiClient::new(&base_url, Duration::from_secs(5)).unwrap();
    assert!(matches!(client.search("lofi", 5).await, Err(LibraryError::UpstreamUnavailable(_))));
}

#[tokio::test]
async fn test_blank_query_is_rejected_locally() {
    let catalog = Arc::new(StubCatalog::with_results(vec![candidate("t1", "Rain")]));
    let reconciler = setup(catalog.clone()).await;

    assert!(matches!(reconciler.search("   ").await, Err(LibraryError::InvalidInput(_))));
    assert_eq!(catalog.calls(), 0);
}

#[tokio::test]
async fn test_unreachable_service_is_upstream_unavailable() {
    let client = LibraryApiClient::new("http://127.0.0.1:9/api", Duration::from_secs(1)).unwrap();
    let reconciler = Reconciler::new(client.clone(), client);

    assert!(matches!(reconciler.list_songs(None).await, Err(LibraryError::UpstreamUnavailable(_))));
    assert!(matches!(reconciler.stats().await, Err(LibraryError::UpstreamUnavailable(_))));
    assert!(matches!(
        reconciler.import_candidate(&candidate("t1", "Rain"), &annotation("Chill", 5, None)).await,
        Err(LibraryError::UpstreamUnavailable(_))
    ));
}
