//! Waveform plots of synthesized audio.
//!
//! The plot mirrors a dark-theme line chart: transparent figure, dark axes
//! area, dashed gray grid, white spines, ticks and labels, and a cyan
//! amplitude trace over a time axis in seconds.

mod canvas;
mod font;

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use image::ImageFormat;
use ndarray::Array1;
use serde::Serialize;

use crate::studio::Session;
use crate::{AudioClip, StudioError};

use canvas::{with_alpha, Canvas, Color};
use font::Typeface;

/// Maximum characters of the request text shown in the plot title.
pub const TITLE_MAX_CHARS: usize = 30;

const TITLE_SIZE: f32 = 17.0;
const LABEL_SIZE: f32 = 15.0;
const TICK_SIZE: f32 = 12.0;
const TICK_LENGTH: i64 = 4;
const GRID_DASH: (i64, i64) = (4, 3);
/// Fraction of the data range added on each side of both axes.
const MARGIN: f64 = 0.05;

/// Trim `text` to `max_length` characters, appending `"..."` when cut.
pub fn trim_text(text: &str, max_length: usize) -> String {
    match text.char_indices().nth(max_length) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Time of each frame in seconds: `frames` points evenly spaced from 0 to
/// `frames / sample_rate`, both ends included.
pub fn time_axis(frames: usize, sample_rate: u32) -> Array1<f64> {
    let end = if sample_rate == 0 {
        0.0
    } else {
        frames as f64 / sample_rate as f64
    };
    Array1::linspace(0.0, end, frames)
}

/// Evenly spaced "round" tick values (1, 2 or 5 × 10ⁿ apart) within `lo..=hi`.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 || target == 0 {
        return Vec::new();
    }
    let step = nice_step(span / target as f64);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last)
        .map(|i| {
            let v = i as f64 * step;
            if v.abs() < step * 1e-9 {
                0.0
            } else {
                v
            }
        })
        .collect()
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let factor = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

fn tick_label(value: f64, step: f64) -> String {
    let decimals = if step > 0.0 {
        (-step.log10().floor()).max(0.0) as usize
    } else {
        0
    };
    format!("{value:.decimals$}")
}

/// Look and size of a rendered waveform.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct WaveformOptions {
    pub width: u32,
    pub height: u32,
    /// Figure background outside the axes; transparent by default.
    pub figure_color: Color,
    pub face_color: Color,
    pub line_color: Color,
    pub grid_color: Color,
    pub text_color: Color,
    #[builder(setter(into))]
    pub title_prefix: String,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            figure_color: [0x1E, 0x1E, 0x1E, 0x00],
            face_color: [0x2E, 0x2E, 0x2E, 0xFF],
            line_color: with_alpha([0x00, 0xFF, 0xFF, 0xFF], 0.8),
            grid_color: with_alpha([0x80, 0x80, 0x80, 0xFF], 0.5),
            text_color: [0xFF, 0xFF, 0xFF, 0xFF],
            title_prefix: "Waveform for text input: ".to_string(),
        }
    }
}

impl WaveformOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        let width = self.width.unwrap_or(800);
        let height = self.height.unwrap_or(400);
        if width < 200 || height < 150 {
            return Err(format!(
                "waveform image must be at least 200x150 pixels, got {width}x{height}"
            ));
        }
        Ok(())
    }
}

/// A rendered waveform image on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveformArtifact {
    pub image_path: PathBuf,
}

/// Plot the session's last generated audio to `output_path` (PNG, overwritten).
///
/// Returns `Ok(None)` when the session has no audio yet or its file is gone.
pub fn render_waveform(
    session: &Session,
    output_path: &Path,
    options: &WaveformOptions,
) -> Result<Option<WaveformArtifact>, StudioError> {
    let Some(audio_path) = session.last_audio().filter(|p| p.is_file()) else {
        return Ok(None);
    };

    let clip = AudioClip::read_wav(audio_path)?;
    let title = format!(
        "{}'{}'",
        options.title_prefix,
        trim_text(session.last_text(), TITLE_MAX_CHARS)
    );

    let image = plot(&clip, &title, options)?.into_image();
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save_with_format(output_path, ImageFormat::Png)?;
    log::info!(
        "Rendered waveform of {} ({} frames) to {}",
        audio_path.display(),
        clip.frames(),
        output_path.display()
    );

    Ok(Some(WaveformArtifact {
        image_path: output_path.to_path_buf(),
    }))
}

/// Pixel rectangle of the axes area.
struct Frame {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl Frame {
    fn for_size(width: u32, height: u32) -> Self {
        let (width, height) = (width as i64, height as i64);
        Self {
            left: width / 10,
            top: height / 10,
            right: width - width / 40,
            bottom: height - height / 8,
        }
    }

    fn width(&self) -> f64 {
        (self.right - self.left) as f64
    }

    fn height(&self) -> f64 {
        (self.bottom - self.top) as f64
    }
}

/// Linear mapping from data space into the frame.
struct Scale {
    x: (f64, f64),
    y: (f64, f64),
}

impl Scale {
    fn px(&self, frame: &Frame, x: f64) -> f64 {
        frame.left as f64 + (x - self.x.0) / (self.x.1 - self.x.0) * frame.width()
    }

    fn py(&self, frame: &Frame, y: f64) -> f64 {
        frame.bottom as f64 - (y - self.y.0) / (self.y.1 - self.y.0) * frame.height()
    }
}

fn padded_range(lo: f64, hi: f64) -> (f64, f64) {
    if !(lo.is_finite() && hi.is_finite()) {
        return (-1.0, 1.0);
    }
    let span = hi - lo;
    if span <= 0.0 {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * MARGIN };
        return (lo - pad, hi + pad);
    }
    (lo - span * MARGIN, hi + span * MARGIN)
}

fn plot(clip: &AudioClip, title: &str, options: &WaveformOptions) -> Result<Canvas, StudioError> {
    let face = Typeface::embedded()?;
    let mut canvas = Canvas::new(options.width, options.height, options.figure_color);
    let frame = Frame::for_size(options.width, options.height);

    let samples = clip.channel(0);
    let times = time_axis(samples.len(), clip.sample_rate);
    let duration = times.iter().copied().fold(0.0, f64::max);

    let (lo, hi) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s as f64), hi.max(s as f64))
        });
    let scale = Scale {
        x: padded_range(0.0, duration),
        y: if samples.is_empty() {
            (-1.0, 1.0)
        } else {
            padded_range(lo, hi)
        },
    };

    canvas.fill_rect(
        frame.left,
        frame.top,
        frame.right,
        frame.bottom,
        options.face_color,
    );

    draw_grid_and_ticks(&mut canvas, &face, &frame, &scale, options);
    draw_trace(&mut canvas, &frame, &scale, &times, &samples, options.line_color);

    // Spines
    canvas.hline(frame.left, frame.right, frame.bottom, options.text_color, None);
    canvas.vline(frame.left, frame.top, frame.bottom, options.text_color, None);

    draw_labels(&mut canvas, &face, &frame, title, options);
    Ok(canvas)
}

fn draw_grid_and_ticks(
    canvas: &mut Canvas,
    face: &Typeface,
    frame: &Frame,
    scale: &Scale,
    options: &WaveformOptions,
) {
    let x_ticks = nice_ticks(scale.x.0, scale.x.1, 8);
    let x_step = step_of(&x_ticks);
    for &t in &x_ticks {
        let x = scale.px(frame, t).round() as i64;
        canvas.vline(x, frame.top, frame.bottom, options.grid_color, Some(GRID_DASH));
        canvas.vline(x, frame.bottom, frame.bottom + TICK_LENGTH, options.text_color, None);
        let label = tick_label(t, x_step);
        let w = face.text_width(&label, TICK_SIZE) as i64;
        canvas.text(
            face,
            x - w / 2,
            frame.bottom + TICK_LENGTH + 2,
            &label,
            TICK_SIZE,
            options.text_color,
        );
    }

    let y_ticks = nice_ticks(scale.y.0, scale.y.1, 6);
    let y_step = step_of(&y_ticks);
    for &v in &y_ticks {
        let y = scale.py(frame, v).round() as i64;
        canvas.hline(frame.left, frame.right, y, options.grid_color, Some(GRID_DASH));
        canvas.hline(frame.left - TICK_LENGTH, frame.left, y, options.text_color, None);
        let label = tick_label(v, y_step);
        let w = face.text_width(&label, TICK_SIZE) as i64;
        canvas.text(
            face,
            frame.left - TICK_LENGTH - 3 - w,
            y - face.line_height(TICK_SIZE) as i64 / 2,
            &label,
            TICK_SIZE,
            options.text_color,
        );
    }
}

fn step_of(ticks: &[f64]) -> f64 {
    match ticks {
        [a, b, ..] => b - a,
        _ => 1.0,
    }
}

/// Draw the amplitude trace.
///
/// With more frames than pixel columns each column gets one vertical span
/// covering its min and max (joined to the previous column); otherwise the
/// points are connected with straight segments.
fn draw_trace(
    canvas: &mut Canvas,
    frame: &Frame,
    scale: &Scale,
    times: &Array1<f64>,
    samples: &[f32],
    color: Color,
) {
    if samples.is_empty() {
        return;
    }

    let columns = (frame.right - frame.left).max(1) as usize;
    if samples.len() <= columns {
        let points: Vec<(f64, f64)> = times
            .iter()
            .zip(samples)
            .map(|(&t, &s)| (scale.px(frame, t), scale.py(frame, s as f64)))
            .collect();
        match points.as_slice() {
            [single] => canvas.blend(single.0.round() as i64, single.1.round() as i64, color),
            _ => {
                for pair in points.windows(2) {
                    canvas.line(pair[0], pair[1], color);
                }
            }
        }
        return;
    }

    let mut spans: Vec<Option<(f64, f64)>> = vec![None; canvas.width() as usize];
    for (&t, &s) in times.iter().zip(samples) {
        let x = scale.px(frame, t).round();
        if x < 0.0 || x as usize >= spans.len() {
            continue;
        }
        let y = scale.py(frame, s as f64);
        let span = &mut spans[x as usize];
        *span = Some(match *span {
            Some((top, bottom)) => (top.min(y), bottom.max(y)),
            None => (y, y),
        });
    }

    let mut previous: Option<(f64, f64)> = None;
    for (x, span) in spans.iter().enumerate() {
        let Some((mut top, mut bottom)) = *span else {
            continue;
        };
        if let Some((prev_top, prev_bottom)) = previous {
            // Close the gap to the previous column so the trace stays connected.
            top = top.min(prev_bottom);
            bottom = bottom.max(prev_top);
        }
        canvas.vline(x as i64, top.round() as i64, bottom.round() as i64, color, None);
        previous = *span;
    }
}

fn draw_labels(
    canvas: &mut Canvas,
    face: &Typeface,
    frame: &Frame,
    title: &str,
    options: &WaveformOptions,
) {
    let color = options.text_color;
    let line = |size: f32| face.line_height(size) as i64;

    let title_width = face.text_width(title, TITLE_SIZE) as i64;
    let centre = (frame.left + frame.right) / 2;
    let title_x = (centre - title_width / 2).max(2);
    canvas.text(
        face,
        title_x,
        ((frame.top - line(TITLE_SIZE)) / 2).max(0),
        title,
        TITLE_SIZE,
        color,
    );

    let x_label = "Time (seconds)";
    let x_width = face.text_width(x_label, LABEL_SIZE) as i64;
    canvas.text(
        face,
        centre - x_width / 2,
        canvas.height() as i64 - line(LABEL_SIZE) - 2,
        x_label,
        LABEL_SIZE,
        color,
    );

    let y_label = "Amplitude";
    let y_length = face.text_width(y_label, LABEL_SIZE) as i64;
    canvas.text_vertical(
        face,
        4,
        (frame.top + frame.bottom) / 2 - y_length / 2,
        y_label,
        LABEL_SIZE,
        color,
    );
}
