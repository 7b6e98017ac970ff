use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Classroom {
    pub id: i64,
    pub building: String,
    pub name: String,
    pub window_count: Option<i64>,
    pub created_at: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Surface {
    pub id: i64,
    pub classroom_id: i64,
    pub space_name: String,
    pub material: String,
    pub area: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ClassroomImage {
    pub id: i64,
    pub classroom_id: i64,
    pub filename: String,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Recording {
    pub id: i64,
    pub classroom_id: Option<i64>,
    pub original_filename: String,
    /// File name inside the uploads directory, as served under `/play/`.
    pub audio_filename: String,
    /// Full path of the stored audio file. Server-side only.
    #[serde(skip_serializing)]
    pub audio_path: String,
    /// File name inside the spectrograms directory.
    pub spectrogram_filename: String,
    #[serde(flatten)]
    pub metadata: RecordingMetadata,
    pub created_at: i64,
}

/// Free-text metadata submitted along with an upload. Every field is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordingMetadata {
    pub researcher: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub tags: Option<String>,
}

/// A classroom together with everything it owns.
#[derive(Clone, Debug, Serialize)]
pub struct ClassroomDetail {
    #[serde(flatten)]
    pub classroom: Classroom,
    pub surfaces: Vec<Surface>,
    pub images: Vec<ClassroomImage>,
    pub recordings: Vec<Recording>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewClassroom {
    pub building: String,
    pub name: String,
    pub window_count: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewSurface {
    pub space_name: String,
    pub material: String,
    pub area: f64,
}

#[derive(Clone, Debug)]
pub struct NewRecording {
    pub classroom_id: Option<i64>,
    pub original_filename: String,
    pub audio_filename: String,
    pub audio_path: String,
    pub spectrogram_filename: String,
    pub metadata: RecordingMetadata,
}

/// Changes applied by a classroom edit, in a single transaction.
#[derive(Clone, Debug)]
pub struct ClassroomUpdate {
    pub classroom: NewClassroom,
    pub delete_surface_ids: Vec<i64>,
    pub new_surfaces: Vec<NewSurface>,
    pub delete_image_ids: Vec<i64>,
    pub new_image_filenames: Vec<String>,
}

/// Which recordings a listing returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingScope {
    All,
    TopLevel,
    Classroom(i64),
}
