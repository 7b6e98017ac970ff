mod file_config;

pub use file_config::{FileConfig, FmaxValue, SpectrogramConfig};

use crate::media::MediaDirs;
use crate::server::RequestsLoggingLevel;
use crate::spectrogram::{SpectrogramSettings, MIN_HEIGHT, MIN_WIDTH};
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_bytes: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            port: 5000,
            logging_level: RequestsLoggingLevel::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub spectrograms_dir: PathBuf,
    pub classroom_images_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub max_upload_bytes: usize,
    pub spectrogram: SpectrogramSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| anyhow!("data_dir must be specified via --data-dir or in config file"))?;

        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let uploads_dir = file
            .uploads_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("uploads"));
        let spectrograms_dir = file
            .spectrograms_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("spectrograms"));
        let classroom_images_dir = file
            .classroom_images_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| uploads_dir.join("aulas_img"));

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let max_upload_bytes = file.max_upload_bytes.unwrap_or(cli.max_upload_bytes);
        if max_upload_bytes == 0 {
            bail!("max_upload_bytes must be greater than zero");
        }

        let spectrogram = resolve_spectrogram(file.spectrogram.unwrap_or_default())?;

        Ok(Self {
            data_dir,
            uploads_dir,
            spectrograms_dir,
            classroom_images_dir,
            port,
            logging_level,
            max_upload_bytes,
            spectrogram,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("database.db")
    }

    pub fn media_dirs(&self) -> MediaDirs {
        MediaDirs {
            uploads: self.uploads_dir.clone(),
            spectrograms: self.spectrograms_dir.clone(),
            classroom_images: self.classroom_images_dir.clone(),
        }
    }
}

fn resolve_spectrogram(file: SpectrogramConfig) -> Result<SpectrogramSettings> {
    let defaults = SpectrogramSettings::default();

    let fmax = match file.fmax {
        None => None,
        Some(FmaxValue::Named(name)) if name.eq_ignore_ascii_case("nyquist") => None,
        Some(FmaxValue::Named(name)) => bail!("Invalid spectrogram fmax: {:?}", name),
        Some(FmaxValue::Hz(hz)) if hz > 0.0 => Some(hz as f32),
        Some(FmaxValue::Hz(hz)) => bail!("Spectrogram fmax must be positive, got {}", hz),
    };

    let settings = SpectrogramSettings {
        n_mels: file.n_mels.unwrap_or(defaults.n_mels),
        n_fft: file.n_fft.unwrap_or(defaults.n_fft),
        hop_length: file.hop_length.unwrap_or(defaults.hop_length),
        fmax,
        target_sample_rate: file.target_sample_rate,
        top_db: file.top_db.unwrap_or(defaults.top_db),
        width: file.width.unwrap_or(defaults.width),
        height: file.height.unwrap_or(defaults.height),
    };

    if settings.n_mels == 0 {
        bail!("Spectrogram n_mels must be at least 1");
    }
    if settings.n_fft < 16 {
        bail!("Spectrogram n_fft must be at least 16, got {}", settings.n_fft);
    }
    if settings.hop_length == 0 {
        bail!("Spectrogram hop_length must be at least 1");
    }
    if settings.target_sample_rate == Some(0) {
        bail!("Spectrogram target_sample_rate must be positive");
    }
    if settings.top_db.is_nan() || settings.top_db <= 0.0 {
        bail!("Spectrogram top_db must be positive, got {}", settings.top_db);
    }
    if settings.width < MIN_WIDTH || settings.height < MIN_HEIGHT {
        bail!(
            "Spectrogram canvas must be at least {}x{}, got {}x{}",
            MIN_WIDTH,
            MIN_HEIGHT,
            settings.width,
            settings.height
        );
    }
    Ok(settings)
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
