#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use songbook_server::api::{create_router, AppState};
use songbook_server::catalog::CatalogClient;
use songbook_server::error::LibraryError;
use songbook_server::library::TrackCandidate;

/// Fresh in-memory sqlite database with the schema applied.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    // Every pooled connection would get its own empty in-memory database
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await.expect("Should connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("Should run migrations");
    db
}

pub fn candidate(id: &str, title: &str) -> TrackCandidate {
    TrackCandidate {
        id: id.to_string(),
        title: title.to_string(),
        artist: "A".to_string(),
        album: "Clouds".to_string(),
        image_url: "https://i.scdn.co/image/cover".to_string(),
        preview_url: "https://p.scdn.co/mp3-preview/x".to_string(),
        release_date: "2019-05-01".to_string(),
        duration: 201_000,
    }
}

/// Catalog returning fixed candidates, or failing when built with `failing()`.
#[derive(Default)]
pub struct StubCatalog {
    pub results: Vec<TrackCandidate>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubCatalog {
    pub fn with_results(results: Vec<TrackCandidate>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for StubCatalog {
    async fn search(&self, _query: &str, limit: u32) -> Result<Vec<TrackCandidate>, LibraryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LibraryError::UpstreamUnavailable("Spotify API error 503".to_string()));
        }
        Ok(self.results.iter().take(limit as usize).cloned().collect())
    }
}

/// Binds the full router on an ephemeral port and returns its `/api` base URL.
pub async fn spawn_server(state: AppState) -> (SocketAddr, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, format!("http://{}/api", addr))
}

pub fn stub_state(db: DatabaseConnection, catalog: Arc<StubCatalog>) -> AppState {
    AppState::new(db).with_catalog(catalog)
}
