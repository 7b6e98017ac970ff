//! Classroom registry: classrooms, their surfaces, images and recordings.

mod models;
mod schema;
mod store;

pub use models::*;
pub use schema::CLASSROOM_VERSIONED_SCHEMAS;
pub use store::SqliteClassroomStore;

use anyhow::Result;

pub trait ClassroomStore: Send + Sync {
    // Classrooms
    /// Inserts a classroom with its surfaces and image rows. Returns the new id.
    fn create_classroom(
        &self,
        classroom: &NewClassroom,
        surfaces: &[NewSurface],
        image_filenames: &[String],
    ) -> Result<i64>;
    fn get_classroom(&self, id: i64) -> Result<Option<Classroom>>;
    fn get_classroom_detail(&self, id: i64) -> Result<Option<ClassroomDetail>>;
    /// Lists classrooms, optionally filtered by a case-insensitive substring of the
    /// building, the name or any surface material.
    fn list_classrooms(&self, query: Option<&str>) -> Result<Vec<Classroom>>;
    /// Returns false if the classroom does not exist.
    fn update_classroom(&self, id: i64, update: &ClassroomUpdate) -> Result<bool>;
    /// Deletes the classroom and every child row. Returns false if it did not exist.
    fn delete_classroom(&self, id: i64) -> Result<bool>;

    // Images
    fn get_image(&self, id: i64) -> Result<Option<ClassroomImage>>;

    // Recordings
    fn insert_recording(&self, recording: &NewRecording) -> Result<Recording>;
    fn get_recording(&self, id: i64) -> Result<Option<Recording>>;
    fn list_recordings(&self, scope: RecordingScope) -> Result<Vec<Recording>>;
    fn delete_recording(&self, id: i64) -> Result<bool>;
}
