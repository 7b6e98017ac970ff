use super::SpectrogramError;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded mono signal at its sample rate.
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decodes the first audio track of `path` and downmixes it to mono by averaging channels.
pub fn decode_to_mono(path: &Path) -> Result<MonoAudio, SpectrogramError> {
    let file = std::fs::File::open(path)
        .map_err(|e| SpectrogramError::Decode(format!("cannot open {:?}: {}", path, e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SpectrogramError::Decode(format!("unrecognized format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SpectrogramError::Decode("no audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| SpectrogramError::Decode("unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SpectrogramError::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                warn!("Stopped reading packets of {:?}: {}", path, e);
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping undecodable packet in {:?}: {}", path, e);
                continue;
            }
            Err(e) => return Err(SpectrogramError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);

        let channels = spec.channels.count();
        if channels > 1 {
            samples.extend(
                buffer
                    .samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        } else {
            samples.extend_from_slice(buffer.samples());
        }
    }

    Ok(MonoAudio {
        samples,
        sample_rate,
    })
}

/// Resamples a mono signal. Returns the input unchanged when the rates match.
pub fn resample(audio: MonoAudio, to_sr: u32) -> Result<MonoAudio, SpectrogramError> {
    if audio.sample_rate == to_sr || audio.samples.is_empty() {
        return Ok(audio);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(
        to_sr as f64 / audio.sample_rate as f64,
        2.0,
        params,
        audio.samples.len(),
        1,
    )
    .map_err(|e| SpectrogramError::Compute(format!("resampler setup failed: {}", e)))?;

    let output = resampler
        .process(&[audio.samples], None)
        .map_err(|e| SpectrogramError::Compute(format!("resampling failed: {}", e)))?;

    Ok(MonoAudio {
        samples: output.into_iter().next().unwrap_or_default(),
        sample_rate: to_sr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_mono_wav_at_native_rate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 22050, 1, 22050);

        let audio = decode_to_mono(&path).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.samples.len(), 22050);
    }

    #[test]
    fn downmixes_stereo() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 16000, 2, 8000);

        let audio = decode_to_mono(&path).unwrap();
        assert_eq!(audio.samples.len(), 8000);
    }

    #[test]
    fn zero_byte_file_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::write(&path, b"").unwrap();

        assert!(matches!(
            decode_to_mono(&path),
            Err(SpectrogramError::Decode(_))
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(matches!(
            decode_to_mono(&path),
            Err(SpectrogramError::Decode(_))
        ));
    }

    #[test]
    fn resample_changes_length_proportionally() {
        let audio = MonoAudio {
            samples: vec![0.0; 44100],
            sample_rate: 44100,
        };
        let out = resample(audio, 22050).unwrap();
        assert_eq!(out.sample_rate, 22050);
        assert!((out.samples.len() as i64 - 22050).abs() < 64);
    }
}
