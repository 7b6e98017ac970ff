//! Filesystem storage for uploaded audio, classroom photos and spectrogram images.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Spectrogram file name recorded when rendering fails.
pub const PLACEHOLDER_SPECTROGRAM: &str = "error.png";

/// Name used when sanitizing leaves nothing of the client file name.
const FALLBACK_FILENAME: &str = "upload";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not write placeholder image: {0}")]
    Placeholder(String),
}

#[derive(Debug, Clone)]
pub struct MediaDirs {
    pub uploads: PathBuf,
    pub spectrograms: PathBuf,
    pub classroom_images: PathBuf,
}

/// An audio upload persisted to the uploads directory.
#[derive(Debug, Clone)]
pub struct StoredAudio {
    /// The sanitized client file name.
    pub sanitized_name: String,
    /// `<uuid>_<sanitized name>`, the file name inside the uploads directory.
    pub stored_name: String,
    /// Full path of the file on disk.
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    dirs: MediaDirs,
}

impl MediaStore {
    pub fn new(dirs: MediaDirs) -> Self {
        Self { dirs }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.dirs.uploads
    }

    pub fn spectrograms_dir(&self) -> &Path {
        &self.dirs.spectrograms
    }

    pub fn classroom_images_dir(&self) -> &Path {
        &self.dirs.classroom_images
    }

    pub fn placeholder_path(&self) -> PathBuf {
        self.dirs.spectrograms.join(PLACEHOLDER_SPECTROGRAM)
    }

    /// Creates the media directories and writes the placeholder spectrogram if missing.
    pub async fn init(&self) -> Result<(), MediaError> {
        fs::create_dir_all(&self.dirs.uploads).await?;
        fs::create_dir_all(&self.dirs.spectrograms).await?;
        fs::create_dir_all(&self.dirs.classroom_images).await?;

        let placeholder = self.placeholder_path();
        if !placeholder.exists() {
            let target = placeholder.clone();
            tokio::task::spawn_blocking(move || crate::spectrogram::write_placeholder(&target))
                .await
                .map_err(|e| MediaError::Placeholder(e.to_string()))?
                .map_err(|e| MediaError::Placeholder(e.to_string()))?;
            debug!("Wrote placeholder spectrogram to {:?}", placeholder);
        }
        Ok(())
    }

    /// Saves an audio upload under `<uuid>_<sanitized name>` so that uploads sharing a
    /// client file name never overwrite each other.
    pub async fn save_audio(
        &self,
        client_filename: &str,
        data: &[u8],
    ) -> Result<StoredAudio, MediaError> {
        let sanitized_name = sanitize_filename(client_filename);
        let stored_name = format!("{}_{}", Uuid::new_v4(), sanitized_name);
        let path = self.dirs.uploads.join(&stored_name);
        write_file(&path, data).await?;
        debug!("Saved audio upload {:?} ({} bytes)", path, data.len());
        Ok(StoredAudio {
            sanitized_name,
            stored_name,
            path,
        })
    }

    /// Saves a classroom photo as `<uuid><ext>` and returns the stored file name.
    pub async fn save_classroom_image(
        &self,
        client_filename: &str,
        data: &[u8],
    ) -> Result<String, MediaError> {
        let sanitized = sanitize_filename(client_filename);
        let stored_name = match Path::new(&sanitized).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        write_file(&self.dirs.classroom_images.join(&stored_name), data).await?;
        Ok(stored_name)
    }

    /// Best-effort removal of a stored audio file. Failures are logged and reported as false.
    pub async fn remove_audio(&self, audio_path: &str) -> bool {
        remove_logged(Path::new(audio_path)).await
    }

    /// Best-effort removal of a spectrogram image. The shared placeholder is never removed.
    pub async fn remove_spectrogram(&self, filename: &str) -> bool {
        if filename == PLACEHOLDER_SPECTROGRAM {
            return true;
        }
        remove_logged(&self.dirs.spectrograms.join(filename)).await
    }

    /// Best-effort removal of a classroom photo.
    pub async fn remove_classroom_image(&self, filename: &str) -> bool {
        remove_logged(&self.dirs.classroom_images.join(filename)).await
    }
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), MediaError> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}

async fn remove_logged(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed file {:?}", path);
            true
        }
        Err(e) => {
            warn!("Error removing file {:?}: {}", path, e);
            false
        }
    }
}

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "AUX", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3", "PRN", "NUL",
];

fn fold_to_ascii(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ç' => 'c',
        'Ç' => 'C',
        _ => return None,
    };
    Some(folded)
}

/// Turns a client-supplied file name into one that is safe to use as a path component.
///
/// Accented Latin letters are folded to ASCII, any other non-ASCII character is dropped,
/// path separators and whitespace runs become a single `_`, and only `[A-Za-z0-9._-]`
/// survives. Leading and trailing dots/underscores are stripped.
pub fn sanitize_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter_map(fold_to_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    let stem = trimmed.split('.').next().unwrap_or_default().to_uppercase();
    if WINDOWS_DEVICE_NAMES.contains(&stem.as_str()) {
        return format!("_{}", trimmed);
    }
    trimmed.to_string()
}

/// Name of the spectrogram image generated for an audio file: `<stem>_<uuid>.png`.
pub fn spectrogram_filename_for(sanitized_audio_name: &str) -> String {
    let stem = Path::new(sanitized_audio_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_FILENAME);
    format!("{}_{}.png", stem, Uuid::new_v4())
}
