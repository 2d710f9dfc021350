//! Minimal RGBA raster with source-over blending.

use image::{Rgba, RgbaImage};

use super::font::Typeface;

/// Straight (non-premultiplied) RGBA color.
pub type Color = [u8; 4];

pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// A canvas filled with `background`.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(background)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Composite `color` over the pixel at (`x`, `y`). Out-of-bounds is a no-op.
    pub fn blend(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        dst.0 = over(color, dst.0);
    }

    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                self.blend(x, y, color);
            }
        }
    }

    /// Horizontal line; `dash` of `Some((on, off))` draws a dashed line.
    pub fn hline(&mut self, x0: i64, x1: i64, y: i64, color: Color, dash: Option<(i64, i64)>) {
        for (i, x) in (x0.min(x1)..=x0.max(x1)).enumerate() {
            if dash_on(i as i64, dash) {
                self.blend(x, y, color);
            }
        }
    }

    /// Vertical line; `dash` of `Some((on, off))` draws a dashed line.
    pub fn vline(&mut self, x: i64, y0: i64, y1: i64, color: Color, dash: Option<(i64, i64)>) {
        for (i, y) in (y0.min(y1)..=y0.max(y1)).enumerate() {
            if dash_on(i as i64, dash) {
                self.blend(x, y, color);
            }
        }
    }

    /// Straight segment between two points, one pixel per step along the major axis.
    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Color) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i64;
        let mut last = None;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let px = (from.0 + dx * t).round() as i64;
            let py = (from.1 + dy * t).round() as i64;
            if last != Some((px, py)) {
                self.blend(px, py, color);
                last = Some((px, py));
            }
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn text(&mut self, face: &Typeface, x: i64, y: i64, text: &str, size: f32, color: Color) {
        face.rasterize(text, size, |gx, gy, coverage| {
            self.blend(x + gx, y + gy, with_alpha(color, coverage))
        });
    }

    /// Draw `text` rotated a quarter turn counter-clockwise, reading bottom to top.
    ///
    /// (`x`, `y`) is the top-left corner of the rotated text's bounding box.
    pub fn text_vertical(&mut self, face: &Typeface, x: i64, y: i64, text: &str, size: f32, color: Color) {
        let length = face.text_width(text, size) as i64;
        face.rasterize(text, size, |gx, gy, coverage| {
            // Glyph columns run upwards, glyph rows run rightwards.
            self.blend(x + gy, y + length - 1 - gx, with_alpha(color, coverage))
        });
    }
}

fn dash_on(index: i64, dash: Option<(i64, i64)>) -> bool {
    match dash {
        Some((on, off)) if on > 0 && off > 0 => index % (on + off) < on,
        _ => true,
    }
}

/// Source-over compositing of straight-alpha colors.
pub fn over(src: Color, dst: Color) -> Color {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        out[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    out
}

/// `color` with its alpha scaled by `alpha` in `0.0..=1.0`.
pub fn with_alpha(color: Color, alpha: f32) -> Color {
    let a = (color[3] as f32 * alpha.clamp(0.0, 1.0)).round() as u8;
    [color[0], color[1], color[2], a]
}

#[cfg(test)]
mod tests {
    use super::{over, with_alpha, Canvas, Typeface};

    #[test]
    fn opaque_source_replaces_destination() {
        assert_eq!(over([10, 20, 30, 255], [200, 200, 200, 255]), [10, 20, 30, 255]);
    }

    #[test]
    fn blending_onto_transparent_keeps_source_color() {
        assert_eq!(over([0, 255, 255, 204], [0, 0, 0, 0]), [0, 255, 255, 204]);
    }

    #[test]
    fn fully_transparent_result_is_zeroed() {
        assert_eq!(over([9, 9, 9, 0], [7, 7, 7, 0]), [0, 0, 0, 0]);
    }

    #[test]
    fn with_alpha_scales_existing_alpha() {
        assert_eq!(with_alpha([1, 2, 3, 255], 0.5), [1, 2, 3, 128]);
    }

    #[test]
    fn dashed_line_skips_gaps() {
        let mut canvas = Canvas::new(10, 1, [0, 0, 0, 0]);
        canvas.hline(0, 9, 0, [255, 255, 255, 255], Some((2, 2)));
        let image = canvas.into_image();
        let lit: Vec<bool> = (0..10).map(|x| image.get_pixel(x, 0).0[3] > 0).collect();
        assert_eq!(
            lit,
            vec![true, true, false, false, true, true, false, false, true, true]
        );
    }

    #[test]
    fn vertical_text_is_taller_than_wide() {
        let face = Typeface::embedded().unwrap();
        let mut canvas = Canvas::new(40, 120, [0, 0, 0, 0]);
        canvas.text_vertical(&face, 5, 5, "Amplitude", 16.0, [255, 255, 255, 255]);
        let image = canvas.into_image();
        let lit: Vec<(u32, u32)> = image
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        let span = |axis: fn(&(u32, u32)) -> u32| {
            let values = lit.iter().map(axis);
            values.clone().max().unwrap() - values.min().unwrap()
        };
        assert!(span(|p| p.1) > 2 * span(|p| p.0));
    }

    #[test]
    fn out_of_bounds_blend_is_ignored() {
        let mut canvas = Canvas::new(2, 2, [0, 0, 0, 0]);
        canvas.blend(-1, 0, [255, 255, 255, 255]);
        canvas.blend(5, 5, [255, 255, 255, 255]);
        assert!(canvas.into_image().pixels().all(|p| p.0[3] == 0));
    }
}
