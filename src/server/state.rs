use axum::extract::FromRef;

use crate::classroom_store::ClassroomStore;
use crate::ingestion::IngestionManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedClassroomStore = Arc<dyn ClassroomStore>;
pub type GuardedIngestionManager = Arc<IngestionManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub classroom_store: GuardedClassroomStore,
    pub ingestion_manager: GuardedIngestionManager,
}

impl ServerState {
    pub fn new(config: ServerConfig, ingestion_manager: IngestionManager) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            started_at: chrono::Utc::now(),
            classroom_store: ingestion_manager.store().clone(),
            ingestion_manager: Arc::new(ingestion_manager),
        }
    }
}

impl FromRef<ServerState> for GuardedClassroomStore {
    fn from_ref(input: &ServerState) -> Self {
        input.classroom_store.clone()
    }
}

impl FromRef<ServerState> for GuardedIngestionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.ingestion_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
