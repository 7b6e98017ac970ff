use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub data_dir: Option<String>,
    pub uploads_dir: Option<String>,
    pub spectrograms_dir: Option<String>,
    pub classroom_images_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub max_upload_bytes: Option<usize>,

    pub spectrogram: Option<SpectrogramConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpectrogramConfig {
    pub n_mels: Option<usize>,
    pub n_fft: Option<usize>,
    pub hop_length: Option<usize>,
    /// `"nyquist"` or a frequency in Hz.
    pub fmax: Option<FmaxValue>,
    /// Resample before analysis. Absent keeps the file's own rate.
    pub target_sample_rate: Option<u32>,
    pub top_db: Option<f32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FmaxValue {
    Hz(f64),
    Named(String),
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
