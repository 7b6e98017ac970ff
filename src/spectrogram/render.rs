//! Rasterizes a dB matrix into a spectrogram PNG with axes and a colour bar.

use super::font::{draw_text, text_width, GLYPH_HEIGHT};
use super::mel::hz_to_mel;
use super::SpectrogramError;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub const TITLE: &str = "Mel-frequency spectrogram";

const MARGIN_LEFT: u32 = 64;
const MARGIN_RIGHT: u32 = 110;
const MARGIN_TOP: u32 = 32;
const MARGIN_BOTTOM: u32 = 40;
const COLORBAR_WIDTH: u32 = 16;
const TICK_LEN: u32 = 4;

pub const MIN_WIDTH: u32 = MARGIN_LEFT + MARGIN_RIGHT + 100;
pub const MIN_HEIGHT: u32 = MARGIN_TOP + MARGIN_BOTTOM + 60;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

// Magma sampled at nine evenly spaced stops.
const MAGMA: [[u8; 3]; 9] = [
    [0, 0, 4],
    [28, 16, 68],
    [79, 18, 123],
    [129, 37, 129],
    [181, 54, 122],
    [229, 80, 100],
    [251, 135, 97],
    [254, 194, 135],
    [252, 253, 191],
];

/// Maps `t` in `[0, 1]` onto the magma colormap.
pub fn magma(t: f32) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (MAGMA.len() - 1) as f32;
    let i = (pos.floor() as usize).min(MAGMA.len() - 2);
    let frac = pos - i as f32;
    let (a, b) = (MAGMA[i], MAGMA[i + 1]);
    let mix = |k: usize| (a[k] as f32 + (b[k] as f32 - a[k] as f32) * frac).round() as u8;
    Rgb([mix(0), mix(1), mix(2)])
}

/// What the axes describe.
pub struct PlotAxes {
    /// Seconds covered by the frames.
    pub duration: f32,
    /// Upper edge of the mel axis, in Hz.
    pub fmax: f32,
}

struct Rect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Draws the heatmap of `db[frame][mel]` with low frequencies at the bottom.
pub fn render_spectrogram(
    db: &[Vec<f32>],
    (min_db, max_db): (f32, f32),
    axes: &PlotAxes,
    width: u32,
    height: u32,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    let plot = Rect {
        x: MARGIN_LEFT,
        y: MARGIN_TOP,
        w: width - MARGIN_LEFT - MARGIN_RIGHT,
        h: height - MARGIN_TOP - MARGIN_BOTTOM,
    };

    let (lo, hi) = if max_db - min_db < 1e-3 {
        (max_db - 1.0, max_db)
    } else {
        (min_db, max_db)
    };
    let n_frames = db.len();
    let n_mels = db.first().map(|f| f.len()).unwrap_or(0);

    if n_frames > 0 && n_mels > 0 {
        for px in 0..plot.w {
            let frame = &db[(px as usize * n_frames / plot.w as usize).min(n_frames - 1)];
            for py in 0..plot.h {
                let from_bottom = (plot.h - 1 - py) as usize;
                let mel = (from_bottom * n_mels / plot.h as usize).min(n_mels - 1);
                let color = magma((frame[mel] - lo) / (hi - lo));
                img.put_pixel(plot.x + px, plot.y + py, color);
            }
        }
    }
    draw_frame(&mut img, &plot);

    draw_time_axis(&mut img, &plot, axes.duration);
    draw_mel_axis(&mut img, &plot, axes.fmax);
    draw_colorbar(&mut img, &plot, width, lo, hi);

    let title_x = plot.x as i64 + (plot.w as i64 - text_width(TITLE, 2) as i64) / 2;
    draw_text(&mut img, title_x, 8, TITLE, 2, INK);
    img
}

fn draw_frame(img: &mut RgbImage, r: &Rect) {
    for x in r.x.saturating_sub(1)..=r.x + r.w {
        img.put_pixel(x, r.y.saturating_sub(1), INK);
        img.put_pixel(x, r.y + r.h, INK);
    }
    for y in r.y.saturating_sub(1)..=r.y + r.h {
        img.put_pixel(r.x.saturating_sub(1), y, INK);
        img.put_pixel(r.x + r.w, y, INK);
    }
}

/// Picks a tick step giving at most ten ticks over `duration` seconds.
fn time_step(duration: f32) -> f32 {
    const STEPS: [f32; 12] = [
        0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0,
    ];
    STEPS
        .iter()
        .copied()
        .find(|s| duration / s <= 10.0)
        .unwrap_or(600.0)
}

fn draw_time_axis(img: &mut RgbImage, plot: &Rect, duration: f32) {
    let axis_y = plot.y + plot.h;
    if duration > 0.0 {
        let step = time_step(duration);
        let mut k = 0u32;
        loop {
            let t = k as f32 * step;
            if t > duration {
                break;
            }
            let x = plot.x + ((t / duration) * (plot.w - 1) as f32).round() as u32;
            for dy in 1..=TICK_LEN {
                img.put_pixel(x, axis_y + dy, INK);
            }
            let label = if step < 1.0 {
                format!("{:.1}", t)
            } else {
                format!("{:.0}", t)
            };
            let lx = x as i64 - text_width(&label, 1) as i64 / 2;
            draw_text(img, lx, (axis_y + TICK_LEN + 3) as i64, &label, 1, INK);
            k += 1;
        }
    }
    let label = "Time (s)";
    let lx = plot.x as i64 + (plot.w as i64 - text_width(label, 1) as i64) / 2;
    draw_text(img, lx, (axis_y + TICK_LEN + 16) as i64, label, 1, INK);
}

fn draw_mel_axis(img: &mut RgbImage, plot: &Rect, fmax: f32) {
    let mel_max = hz_to_mel(fmax);
    if mel_max > 0.0 {
        let mut hz = 0.0f32;
        let mut next = 512.0f32;
        while hz <= fmax {
            let frac = hz_to_mel(hz) / mel_max;
            let y = plot.y + plot.h - 1 - (frac * (plot.h - 1) as f32).round() as u32;
            for dx in 1..=TICK_LEN {
                img.put_pixel(plot.x - 1 - dx, y, INK);
            }
            let label = format!("{:.0}", hz);
            let lx = (plot.x - TICK_LEN - 4) as i64 - text_width(&label, 1) as i64;
            draw_text(img, lx, y as i64 - GLYPH_HEIGHT as i64 / 2, &label, 1, INK);
            hz = next;
            next *= 2.0;
        }
    }
    draw_text(img, 6, (plot.y - 14) as i64, "Hz", 1, INK);
}

fn draw_colorbar(img: &mut RgbImage, plot: &Rect, width: u32, lo: f32, hi: f32) {
    let bar = Rect {
        x: width - MARGIN_RIGHT + 15,
        y: plot.y,
        w: COLORBAR_WIDTH,
        h: plot.h,
    };
    for py in 0..bar.h {
        let t = (bar.h - 1 - py) as f32 / (bar.h - 1).max(1) as f32;
        let color = magma(t);
        for px in 0..bar.w {
            img.put_pixel(bar.x + px, bar.y + py, color);
        }
    }
    draw_frame(img, &bar);

    let mut level = (hi / 10.0).floor() * 10.0;
    while level >= lo {
        let frac = (level - lo) / (hi - lo);
        let y = bar.y + bar.h - 1 - (frac * (bar.h - 1) as f32).round() as u32;
        for dx in 1..=TICK_LEN {
            img.put_pixel(bar.x + bar.w + dx, y, INK);
        }
        let label = format_db(level);
        draw_text(
            img,
            (bar.x + bar.w + TICK_LEN + 4) as i64,
            y as i64 - GLYPH_HEIGHT as i64 / 2,
            &label,
            1,
            INK,
        );
        level -= 10.0;
    }
}

/// Colour bar label, signed and without decimals: `+0 dB`, `-40 dB`.
pub fn format_db(level: f32) -> String {
    format!("{:+.0} dB", level + 0.0)
}

/// A neutral image stored in place of a spectrogram that could not be produced.
pub fn render_placeholder(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb([64, 64, 64]));
    let text = "No spectrogram";
    let x = (width as i64 - text_width(text, 3) as i64) / 2;
    let y = (height as i64 - (GLYPH_HEIGHT * 3) as i64) / 2;
    draw_text(&mut img, x, y, text, 3, Rgb([220, 220, 220]));
    img
}

/// Encodes `img` as PNG into a temporary file next to `target`, then renames it into
/// place. Nothing is left behind on failure.
pub fn write_png_atomic(img: &RgbImage, target: &Path) -> Result<(), SpectrogramError> {
    let dir = target
        .parent()
        .ok_or_else(|| SpectrogramError::Write(format!("no parent directory for {:?}", target)))?;

    let mut encoded = Vec::new();
    img.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
        .map_err(|e| SpectrogramError::Write(format!("PNG encoding failed: {}", e)))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| SpectrogramError::Write(format!("cannot create temp file: {}", e)))?;
    tmp.write_all(&encoded)
        .and_then(|_| tmp.flush())
        .map_err(|e| SpectrogramError::Write(e.to_string()))?;
    tmp.persist(target)
        .map_err(|e| SpectrogramError::Write(format!("cannot rename into place: {}", e.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn magma_endpoints() {
        assert_eq!(magma(0.0), Rgb([0, 0, 4]));
        assert_eq!(magma(1.0), Rgb([252, 253, 191]));
        assert_eq!(magma(-3.0), magma(0.0));
        assert_eq!(magma(f32::NAN), magma(0.0));
    }

    #[test]
    fn db_labels_are_signed() {
        assert_eq!(format_db(0.0), "+0 dB");
        assert_eq!(format_db(-0.0), "+0 dB");
        assert_eq!(format_db(-80.0), "-80 dB");
    }

    #[test]
    fn time_ticks_stay_readable() {
        assert_eq!(time_step(0.5), 0.1);
        assert_eq!(time_step(2.0), 0.2);
        assert_eq!(time_step(9.0), 1.0);
        assert_eq!(time_step(180.0), 30.0);
    }

    #[test]
    fn loud_band_is_drawn_at_the_bottom() {
        // Lowest mel band loud, everything else at the floor
        let db: Vec<Vec<f32>> = (0..20)
            .map(|_| {
                let mut frame = vec![-80.0; 16];
                frame[0] = 0.0;
                frame
            })
            .collect();
        let axes = PlotAxes {
            duration: 1.0,
            fmax: 11025.0,
        };
        let img = render_spectrogram(&db, (-80.0, 0.0), &axes, 1000, 400);

        assert_eq!(img.dimensions(), (1000, 400));
        let x = MARGIN_LEFT + 100;
        let bottom = 400 - MARGIN_BOTTOM - 1;
        assert_eq!(*img.get_pixel(x, bottom), magma(1.0));
        assert_eq!(*img.get_pixel(x, MARGIN_TOP), magma(0.0));
    }

    #[test]
    fn smallest_canvas_renders() {
        let db = vec![vec![0.0; 128]; 3];
        let axes = PlotAxes {
            duration: 0.05,
            fmax: 4000.0,
        };
        let img = render_spectrogram(&db, (0.0, 0.0), &axes, MIN_WIDTH, MIN_HEIGHT);
        assert_eq!(img.dimensions(), (MIN_WIDTH, MIN_HEIGHT));
    }

    #[test]
    fn atomic_write_leaves_only_the_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.png");
        write_png_atomic(&render_placeholder(60, 30), &target).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.png")]);
        assert_eq!(image::open(&target).unwrap().width(), 60);
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("out.png");
        assert!(matches!(
            write_png_atomic(&render_placeholder(10, 10), &target),
            Err(SpectrogramError::Write(_))
        ));
    }
}
