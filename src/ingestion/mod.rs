//! Upload workflows that keep files on disk and rows in the store consistent.
//!
//! Recordings: save the audio, render its spectrogram (or fall back to the placeholder),
//! then insert the row. Classrooms: photo files are written before their rows and removed
//! before their rows are deleted.

mod classrooms;
mod manager;

pub use classrooms::ClassroomEdit;
pub use manager::{blank_to_none, IngestionError, IngestionManager, UploadedFile};
