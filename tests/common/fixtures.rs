//! Generated test fixtures

use super::constants::FIXTURE_SAMPLE_RATE;
use std::io::Cursor;
use std::path::Path;

/// A mono 16-bit WAV with a 440 Hz tone.
pub fn wav_tone(seconds: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: FIXTURE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("WAV writer");
        let n = (FIXTURE_SAMPLE_RATE as f32 * seconds) as usize;
        for i in 0..n {
            let t = i as f32 / FIXTURE_SAMPLE_RATE as f32;
            let v = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            writer
                .write_sample((v * i16::MAX as f32) as i16)
                .expect("WAV sample");
        }
        writer.finalize().expect("WAV finalize");
    }
    cursor.into_inner()
}

/// Bytes standing in for a photo; the server stores images without inspecting them.
pub fn fake_jpeg() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F']
}

/// Number of regular files directly inside `dir`.
pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}
