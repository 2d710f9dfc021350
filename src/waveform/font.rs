//! Text rasterisation for plot labels.
//!
//! Glyphs come from the embedded DejaVu Sans face (Latin, Greek and Cyrillic
//! coverage). Each pixel is reported with its coverage so edges blend
//! anti-aliased onto the canvas.

use ab_glyph::{point, Font, FontRef, GlyphId, InvalidFont, PxScale, ScaleFont};

static DEJAVU_SANS: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

pub struct Typeface {
    font: FontRef<'static>,
}

impl Typeface {
    /// The face bundled with the crate.
    pub fn embedded() -> Result<Self, InvalidFont> {
        Ok(Self {
            font: FontRef::try_from_slice(DEJAVU_SANS)?,
        })
    }

    /// Advance width of `text` at `size` pixels, rounded up.
    pub fn text_width(&self, text: &str, size: f32) -> u32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width.ceil().max(0.0) as u32
    }

    /// Ascender to descender at `size` pixels.
    pub fn line_height(&self, size: f32) -> u32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        (scaled.ascent() - scaled.descent()).ceil() as u32
    }

    /// Rasterise `text` laid out from a top-left origin of (0, 0).
    ///
    /// `put` receives pixel offsets from the origin and a coverage in `0.0..=1.0`.
    pub fn rasterize(&self, text: &str, size: f32, mut put: impl FnMut(i64, i64, f32)) {
        let scale = PxScale::from(size);
        let scaled = self.font.as_scaled(scale);
        let baseline = scaled.ascent();
        let mut caret = 0.0;
        let mut previous: Option<GlyphId> = None;

        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            previous = Some(id);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let (left, top) = (bounds.min.x as i64, bounds.min.y as i64);
                outlined.draw(|x, y, coverage| put(left + x as i64, top + y as i64, coverage));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Typeface;

    fn raster(face: &Typeface, text: &str) -> Vec<(i64, i64, u8)> {
        let mut pixels = Vec::new();
        face.rasterize(text, 16.0, |x, y, c| {
            let c = (c * 255.0).round() as u8;
            if c > 0 {
                pixels.push((x, y, c));
            }
        });
        pixels.sort_unstable();
        pixels
    }

    #[test]
    fn accented_text_keeps_its_own_glyphs() {
        let face = Typeface::embedded().unwrap();
        assert_ne!(
            raster(&face, "¿Cómo estás, señor?"),
            raster(&face, "?C?mo est?s, se?or?")
        );
        assert_ne!(raster(&face, "ı"), raster(&face, "?"));
    }

    #[test]
    fn glyphs_stay_inside_the_line_box() {
        let face = Typeface::embedded().unwrap();
        let width = face.text_width("Amplitude", 16.0) as i64;
        let height = face.line_height(16.0) as i64;
        let pixels = raster(&face, "Amplitude");
        assert!(!pixels.is_empty());
        assert!(pixels
            .iter()
            .all(|&(x, y, _)| (-2..=width + 2).contains(&x) && (0..=height).contains(&y)));
    }

    #[test]
    fn measures_text() {
        let face = Typeface::embedded().unwrap();
        assert_eq!(face.text_width("", 16.0), 0);
        assert!(face.text_width("AB", 16.0) > face.text_width("A", 16.0));
        assert!(face.text_width("A", 32.0) > face.text_width("A", 16.0));
        assert!(face.line_height(16.0) >= 16);
    }

    #[test]
    fn spaces_draw_nothing() {
        let face = Typeface::embedded().unwrap();
        assert!(raster(&face, "   ").is_empty());
        assert!(face.text_width("   ", 16.0) > 0);
    }
}
