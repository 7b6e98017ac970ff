//! Recording ingestion: store the upload, render its spectrogram, record the row.

use crate::classroom_store::{ClassroomStore, NewRecording, Recording, RecordingMetadata};
use crate::media::{MediaError, MediaStore};
use crate::spectrogram::{SpectrogramError, SpectrogramOutcome, SpectrogramRenderer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("No file in upload")]
    MissingFile,

    #[error("Classroom not found: {0}")]
    ClassroomNotFound(i64),

    #[error("Recording not found: {0}")]
    RecordingNotFound(i64),

    #[error("File handling error: {0}")]
    Media(#[from] MediaError),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Ingestion task failed: {0}")]
    Task(String),
}

/// A file field received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// File name as sent by the client, unsanitized.
    pub filename: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Browsers send an empty file part with no name when nothing was selected.
    pub fn is_selected(&self) -> bool {
        !self.filename.is_empty()
    }
}

/// Coordinates the classroom store, the media directories and the spectrogram renderer.
pub struct IngestionManager {
    pub(super) store: Arc<dyn ClassroomStore>,
    pub(super) media: MediaStore,
    renderer: SpectrogramRenderer,
}

impl IngestionManager {
    pub fn new(
        store: Arc<dyn ClassroomStore>,
        media: MediaStore,
        renderer: SpectrogramRenderer,
    ) -> Self {
        Self {
            store,
            media,
            renderer,
        }
    }

    pub fn store(&self) -> &Arc<dyn ClassroomStore> {
        &self.store
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Ingests one uploaded recording.
    ///
    /// The audio is written first, then the spectrogram is rendered on a blocking worker,
    /// and only then is the row inserted. Rendering failures never fail the ingestion:
    /// the row references the placeholder image instead.
    pub async fn ingest_recording(
        &self,
        file: Option<UploadedFile>,
        metadata: RecordingMetadata,
        classroom_id: Option<i64>,
    ) -> Result<Recording, IngestionError> {
        if let Some(id) = classroom_id {
            if self.store.get_classroom(id)?.is_none() {
                return Err(IngestionError::ClassroomNotFound(id));
            }
        }

        let file = file
            .filter(UploadedFile::is_selected)
            .ok_or(IngestionError::MissingFile)?;

        let stored = self.media.save_audio(&file.filename, &file.data).await?;

        let renderer = self.renderer.clone();
        let audio_path = stored.path.clone();
        let sanitized = stored.sanitized_name.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            renderer.render_or_placeholder(&audio_path, &sanitized)
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Spectrogram worker for {:?} failed: {}", stored.path, e);
            SpectrogramOutcome::Placeholder {
                cause: SpectrogramError::Compute(e.to_string()),
            }
        });

        let recording = self.store.insert_recording(&NewRecording {
            classroom_id,
            original_filename: stored.sanitized_name.clone(),
            audio_filename: stored.stored_name.clone(),
            audio_path: stored.path.to_string_lossy().to_string(),
            spectrogram_filename: outcome.filename().to_string(),
            metadata: blank_to_none(metadata),
        })?;

        info!(
            "Ingested recording {} ({}) with spectrogram {}",
            recording.id, recording.original_filename, recording.spectrogram_filename
        );
        Ok(recording)
    }

    /// Same as [`Self::ingest_recording`], but on a task of its own. Dropping the returned
    /// future does not stop the ingestion half way, so a disconnected client never leaves
    /// files on disk without a row pointing at them.
    pub async fn ingest_recording_detached(
        self: Arc<Self>,
        file: Option<UploadedFile>,
        metadata: RecordingMetadata,
        classroom_id: Option<i64>,
    ) -> Result<Recording, IngestionError> {
        tokio::spawn(async move { self.ingest_recording(file, metadata, classroom_id).await })
        .await
        .map_err(|e| IngestionError::Task(e.to_string()))?
    }

    /// Removes a recording's files, best effort, then its row. Returns the deleted
    /// recording so callers know which classroom it belonged to.
    pub async fn delete_recording(&self, id: i64) -> Result<Recording, IngestionError> {
        let recording = self
            .store
            .get_recording(id)?
            .ok_or(IngestionError::RecordingNotFound(id))?;

        self.remove_recording_files(&recording).await;
        self.store.delete_recording(id)?;
        info!("Deleted recording {}", id);
        Ok(recording)
    }

    pub(super) async fn remove_recording_files(&self, recording: &Recording) {
        self.media.remove_audio(&recording.audio_path).await;
        self.media
            .remove_spectrogram(&recording.spectrogram_filename)
            .await;
    }
}

fn blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Empty form values are stored as NULL; anything else is kept verbatim.
pub fn blank_to_none(metadata: RecordingMetadata) -> RecordingMetadata {
    RecordingMetadata {
        researcher: blank(metadata.researcher),
        description: blank(metadata.description),
        location: blank(metadata.location),
        tags: blank(metadata.tags),
    }
}
