mod file_store;

pub use file_store::{
    sanitize_filename, spectrogram_filename_for, MediaDirs, MediaError, MediaStore, StoredAudio,
    PLACEHOLDER_SPECTROGRAM,
};
