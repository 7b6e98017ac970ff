//! Audio file to mel spectrogram PNG.

mod decoder;
mod font;
mod mel;
mod render;

pub use decoder::{decode_to_mono, resample, MonoAudio};
pub use mel::{hz_to_mel, mel_to_hz, power_to_db, MelSpectrogram};
pub use render::{MIN_HEIGHT, MIN_WIDTH};

use crate::media::{spectrogram_filename_for, PLACEHOLDER_SPECTROGRAM};
use render::PlotAxes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const AMIN: f32 = 1e-10;
const PLACEHOLDER_WIDTH: u32 = 600;
const PLACEHOLDER_HEIGHT: u32 = 200;

#[derive(Debug, Error)]
pub enum SpectrogramError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("spectrogram computation failed: {0}")]
    Compute(String),

    #[error("image write failed: {0}")]
    Write(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramSettings {
    pub n_mels: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    /// None means Nyquist of the analysed signal.
    pub fmax: Option<f32>,
    /// None preserves the file's native sample rate.
    pub target_sample_rate: Option<u32>,
    pub top_db: f32,
    pub width: u32,
    pub height: u32,
}

impl Default for SpectrogramSettings {
    fn default() -> Self {
        Self {
            n_mels: 128,
            n_fft: 2048,
            hop_length: 512,
            fmax: None,
            target_sample_rate: None,
            top_db: 80.0,
            width: 1000,
            height: 400,
        }
    }
}

/// Result of a render attempt as seen by the ingestion pipeline.
#[derive(Debug)]
pub enum SpectrogramOutcome {
    Rendered(String),
    Placeholder { cause: SpectrogramError },
}

impl SpectrogramOutcome {
    /// File name to record: the rendered image or the shared placeholder.
    pub fn filename(&self) -> &str {
        match self {
            SpectrogramOutcome::Rendered(name) => name,
            SpectrogramOutcome::Placeholder { .. } => PLACEHOLDER_SPECTROGRAM,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpectrogramRenderer {
    settings: SpectrogramSettings,
    output_dir: PathBuf,
}

impl SpectrogramRenderer {
    pub fn new(settings: SpectrogramSettings, output_dir: PathBuf) -> Self {
        Self {
            settings,
            output_dir,
        }
    }

    pub fn settings(&self) -> &SpectrogramSettings {
        &self.settings
    }

    /// Renders the spectrogram of `audio_path` into the output directory and returns the
    /// new file name, derived from `sanitized_name`. On error no file is written.
    pub fn render(&self, audio_path: &Path, sanitized_name: &str) -> Result<String, SpectrogramError> {
        let mut audio = decode_to_mono(audio_path)?;
        if let Some(target) = self.settings.target_sample_rate {
            audio = resample(audio, target)?;
        }
        if audio.samples.is_empty() {
            return Err(SpectrogramError::Compute("empty audio".to_string()));
        }
        if audio.samples.iter().any(|s| !s.is_finite()) {
            return Err(SpectrogramError::Compute(
                "non-finite samples in decoded audio".to_string(),
            ));
        }

        let mel = MelSpectrogram::new(
            self.settings.n_fft,
            self.settings.hop_length,
            self.settings.n_mels,
            audio.sample_rate,
            self.settings.fmax,
        );
        let mut frames = mel.compute(&audio.samples);
        let range = power_to_db(&mut frames, AMIN, self.settings.top_db);
        if !range.0.is_finite() || !range.1.is_finite() {
            return Err(SpectrogramError::Compute(
                "spectrogram has no finite values".to_string(),
            ));
        }

        let axes = PlotAxes {
            duration: (frames.len() * self.settings.hop_length) as f32 / audio.sample_rate as f32,
            fmax: mel.fmax,
        };
        let img = render::render_spectrogram(
            &frames,
            range,
            &axes,
            self.settings.width,
            self.settings.height,
        );

        let filename = spectrogram_filename_for(sanitized_name);
        render::write_png_atomic(&img, &self.output_dir.join(&filename))?;
        debug!(
            "Rendered {} ({} frames at {} Hz) from {:?}",
            filename,
            frames.len(),
            audio.sample_rate,
            audio_path
        );
        Ok(filename)
    }

    /// Like `render`, but failures become the placeholder outcome and are logged.
    pub fn render_or_placeholder(&self, audio_path: &Path, sanitized_name: &str) -> SpectrogramOutcome {
        match self.render(audio_path, sanitized_name) {
            Ok(filename) => SpectrogramOutcome::Rendered(filename),
            Err(cause) => {
                warn!("No spectrogram for {:?}: {}", audio_path, cause);
                SpectrogramOutcome::Placeholder { cause }
            }
        }
    }
}

/// Writes the placeholder image shown for recordings whose spectrogram failed.
pub fn write_placeholder(path: &Path) -> Result<(), SpectrogramError> {
    render::write_png_atomic(
        &render::render_placeholder(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT),
        path,
    )
}
