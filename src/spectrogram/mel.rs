//! Mel power spectrogram computation.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// One triangular mel filter, stored from its first non-zero FFT bin.
struct MelFilter {
    start_bin: usize,
    weights: Vec<f32>,
}

/// Computes mel power spectrograms with a fixed STFT configuration.
pub struct MelSpectrogram {
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub sample_rate: u32,
    /// Upper edge of the top mel band, in Hz.
    pub fmax: f32,
    filters: Vec<MelFilter>,
    window: Vec<f32>,
}

impl MelSpectrogram {
    /// `fmax` defaults to Nyquist and is clamped to it.
    pub fn new(
        n_fft: usize,
        hop_length: usize,
        n_mels: usize,
        sample_rate: u32,
        fmax: Option<f32>,
    ) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let fmax = fmax.map(|f| f.min(nyquist)).unwrap_or(nyquist);
        Self {
            n_fft,
            hop_length,
            n_mels,
            sample_rate,
            fmax,
            filters: mel_filterbank(n_fft, n_mels, sample_rate, 0.0, fmax),
            window: hann_window(n_fft),
        }
    }

    /// Number of centered frames produced for `n_samples` input samples.
    pub fn frame_count(&self, n_samples: usize) -> usize {
        1 + n_samples / self.hop_length
    }

    /// Mel power per frame: `result[frame][mel]`.
    ///
    /// Frames are centered: the signal is zero-padded by `n_fft / 2` on both sides, so
    /// frame `t` is centered on sample `t * hop_length`.
    pub fn compute(&self, audio: &[f32]) -> Vec<Vec<f32>> {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(self.n_fft);
        let pad = self.n_fft / 2;
        let n_bins = self.n_fft / 2 + 1;

        let num_frames = self.frame_count(audio.len());
        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut power = vec![0.0f32; n_bins];

        for i in 0..num_frames {
            let start = (i * self.hop_length) as isize - pad as isize;
            for (j, slot) in buffer.iter_mut().enumerate() {
                let idx = start + j as isize;
                let sample = if idx >= 0 && (idx as usize) < audio.len() {
                    audio[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[j], 0.0);
            }

            fft.process(&mut buffer);
            for (p, c) in power.iter_mut().zip(buffer.iter()) {
                *p = c.norm_sqr();
            }

            frames.push(
                self.filters
                    .iter()
                    .map(|filter| {
                        filter
                            .weights
                            .iter()
                            .zip(&power[filter.start_bin..])
                            .map(|(w, p)| w * p)
                            .sum()
                    })
                    .collect(),
            );
        }

        frames
    }
}

/// Converts power to decibels relative to the matrix maximum, in place.
///
/// Values are floored at `amin` before the logarithm and the result is clipped to
/// `max_db - top_db`. Returns the resulting `(min_db, max_db)`.
pub fn power_to_db(frames: &mut [Vec<f32>], amin: f32, top_db: f32) -> (f32, f32) {
    let reference = frames
        .iter()
        .flatten()
        .fold(0.0f32, |acc, &v| acc.max(v))
        .max(amin);
    let ref_db = 10.0 * reference.log10();

    let mut max_db = f32::NEG_INFINITY;
    for v in frames.iter_mut().flatten() {
        *v = 10.0 * v.max(amin).log10() - ref_db;
        max_db = max_db.max(*v);
    }

    let floor = max_db - top_db;
    let mut min_db = f32::INFINITY;
    for v in frames.iter_mut().flatten() {
        *v = v.max(floor);
        min_db = min_db.min(*v);
    }
    (min_db, max_db)
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

// Slaney mel scale: linear below 1 kHz, logarithmic above.
const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

pub fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular filters with area normalization, each band spanning two neighbours on the
/// mel scale between `fmin` and `fmax`.
fn mel_filterbank(n_fft: usize, n_mels: usize, sr: u32, fmin: f32, fmax: f32) -> Vec<MelFilter> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f32> = (0..n_bins)
        .map(|i| i as f32 * sr as f32 / n_fft as f32)
        .collect();

    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let enorm = 2.0 / (right - left);
            let dense: Vec<f32> = fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (center - left);
                    let upper = (right - f) / (right - center);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect();

            let start_bin = dense.iter().position(|&w| w > 0.0).unwrap_or(n_bins);
            let end_bin = dense
                .iter()
                .rposition(|&w| w > 0.0)
                .map(|i| i + 1)
                .unwrap_or(start_bin);
            MelFilter {
                start_bin,
                weights: dense[start_bin..end_bin.max(start_bin)].to_vec(),
            }
        })
        .collect()
}
