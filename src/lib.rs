//! Aulas Catalog Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod classroom_store;
pub mod config;
pub mod ingestion;
pub mod media;
pub mod server;
pub mod spectrogram;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use classroom_store::{ClassroomStore, SqliteClassroomStore};
pub use ingestion::IngestionManager;
pub use server::{run_server, RequestsLoggingLevel};
