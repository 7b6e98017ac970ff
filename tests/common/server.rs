//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database and media directories.

use super::constants::*;
use aulas_catalog_server::classroom_store::{ClassroomStore, SqliteClassroomStore};
use aulas_catalog_server::config::DEFAULT_MAX_UPLOAD_BYTES;
use aulas_catalog_server::ingestion::IngestionManager;
use aulas_catalog_server::media::{MediaDirs, MediaStore};
use aulas_catalog_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use aulas_catalog_server::spectrogram::{SpectrogramRenderer, SpectrogramSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated database and media directories
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Store for direct database access in tests
    pub store: Arc<dyn ClassroomStore>,

    pub uploads_dir: PathBuf,
    pub spectrograms_dir: PathBuf,
    pub classroom_images_dir: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with the default upload limit
    pub async fn spawn() -> Self {
        Self::spawn_with_limit(DEFAULT_MAX_UPLOAD_BYTES).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the directories, database or listener cannot be set up, or if the
    /// server doesn't become ready within timeout.
    pub async fn spawn_with_limit(max_upload_bytes: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let uploads_dir = temp_dir.path().join("uploads");
        let spectrograms_dir = temp_dir.path().join("spectrograms");
        let classroom_images_dir = uploads_dir.join("aulas_img");

        let media = MediaStore::new(MediaDirs {
            uploads: uploads_dir.clone(),
            spectrograms: spectrograms_dir.clone(),
            classroom_images: classroom_images_dir.clone(),
        });
        media.init().await.expect("Failed to create media dirs");

        let store: Arc<dyn ClassroomStore> = Arc::new(
            SqliteClassroomStore::new(temp_dir.path().join("database.db"))
                .expect("Failed to open classroom store"),
        );
        let renderer =
            SpectrogramRenderer::new(SpectrogramSettings::default(), spectrograms_dir.clone());
        let manager = IngestionManager::new(store.clone(), media, renderer);

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            max_upload_bytes,
        };
        let app = make_app(config, manager).expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            uploads_dir,
            spectrograms_dir,
            classroom_images_dir,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the /status endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/status", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
