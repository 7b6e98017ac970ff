//! Classroom operations that own files on disk: photos and recordings.

use super::manager::{IngestionError, IngestionManager, UploadedFile};
use crate::classroom_store::{ClassroomUpdate, NewClassroom, NewSurface};
use tracing::{info, warn};

/// A classroom edit as submitted, before photos are written to disk.
#[derive(Debug, Clone)]
pub struct ClassroomEdit {
    pub classroom: NewClassroom,
    pub delete_surface_ids: Vec<i64>,
    pub new_surfaces: Vec<NewSurface>,
    pub delete_image_ids: Vec<i64>,
    pub new_images: Vec<UploadedFile>,
}

impl IngestionManager {
    async fn save_images(&self, images: &[UploadedFile]) -> Result<Vec<String>, IngestionError> {
        let mut saved = Vec::new();
        for image in images.iter().filter(|i| i.is_selected()) {
            match self
                .media
                .save_classroom_image(&image.filename, &image.data)
                .await
            {
                Ok(name) => saved.push(name),
                Err(e) => {
                    self.discard_images(&saved).await;
                    return Err(e.into());
                }
            }
        }
        Ok(saved)
    }

    async fn discard_images(&self, filenames: &[String]) {
        for name in filenames {
            self.media.remove_classroom_image(name).await;
        }
    }

    /// Saves the photos, then inserts the classroom with its surfaces and photo rows in
    /// one transaction. Photos written for a failed insert are removed again.
    pub async fn create_classroom(
        &self,
        classroom: NewClassroom,
        surfaces: Vec<NewSurface>,
        images: Vec<UploadedFile>,
    ) -> Result<i64, IngestionError> {
        let filenames = self.save_images(&images).await?;
        match self
            .store
            .create_classroom(&classroom, &surfaces, &filenames)
        {
            Ok(id) => {
                info!(
                    "Created classroom {} ({} / {}) with {} surfaces and {} images",
                    id,
                    classroom.building,
                    classroom.name,
                    surfaces.len(),
                    filenames.len()
                );
                Ok(id)
            }
            Err(e) => {
                self.discard_images(&filenames).await;
                Err(e.into())
            }
        }
    }

    /// Applies an edit. Photos marked for deletion lose their file (best effort) before
    /// their row; ids that belong to another classroom are ignored.
    pub async fn update_classroom(&self, id: i64, edit: ClassroomEdit) -> Result<(), IngestionError> {
        if self.store.get_classroom(id)?.is_none() {
            return Err(IngestionError::ClassroomNotFound(id));
        }

        let mut delete_image_ids = Vec::new();
        for image_id in edit.delete_image_ids {
            match self.store.get_image(image_id)? {
                Some(image) if image.classroom_id == id => {
                    self.media.remove_classroom_image(&image.filename).await;
                    delete_image_ids.push(image_id);
                }
                _ => warn!(
                    "Ignoring deletion of image {} not owned by classroom {}",
                    image_id, id
                ),
            }
        }

        let new_image_filenames = self.save_images(&edit.new_images).await?;
        let update = ClassroomUpdate {
            classroom: edit.classroom,
            delete_surface_ids: edit.delete_surface_ids,
            new_surfaces: edit.new_surfaces,
            delete_image_ids,
            new_image_filenames,
        };

        match self.store.update_classroom(id, &update) {
            Ok(true) => {
                info!("Updated classroom {}", id);
                Ok(())
            }
            Ok(false) => {
                self.discard_images(&update.new_image_filenames).await;
                Err(IngestionError::ClassroomNotFound(id))
            }
            Err(e) => {
                self.discard_images(&update.new_image_filenames).await;
                Err(e.into())
            }
        }
    }

    /// Deletes a classroom and everything it owns.
    ///
    /// Files of every photo and recording are removed first; failures are logged and do
    /// not stop the deletion. All rows then go in a single transaction.
    pub async fn delete_classroom(&self, id: i64) -> Result<(), IngestionError> {
        let detail = self
            .store
            .get_classroom_detail(id)?
            .ok_or(IngestionError::ClassroomNotFound(id))?;

        for image in &detail.images {
            self.media.remove_classroom_image(&image.filename).await;
        }
        for recording in &detail.recordings {
            self.remove_recording_files(recording).await;
        }

        self.store.delete_classroom(id)?;
        info!(
            "Deleted classroom {} with {} images and {} recordings",
            id,
            detail.images.len(),
            detail.recordings.len()
        );
        Ok(())
    }
}
