//! Drawing backend wrapper that keeps chart text legible when no system font
//! can be loaded (headless hosts, minimal containers).
//!
//! Text the inner backend cannot rasterize is drawn with a built-in 5x7
//! bitmap face instead, scaled to the requested font size and honouring the
//! anchor and rotation of the text style. Size estimates use the same metrics
//! so chart layout matches what is drawn.

use plotters_backend::text_anchor::{HPos, VPos};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
};
use std::panic;
use tracing::warn;

const GLYPH_ROWS: usize = 7;
/// Font size covered by one glyph pixel, including line spacing.
const PIXELS_PER_SIZE: f64 = 9.0;
const SPACE_ADVANCE: i32 = 3;

pub struct FontSafeBackend<DB> {
    inner: DB,
    warned: bool,
}

impl<DB> FontSafeBackend<DB> {
    pub fn new(inner: DB) -> Self {
        Self {
            inner,
            warned: false,
        }
    }
}

impl<DB: DrawingBackend> DrawingBackend for FontSafeBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        let inner = &mut self.inner;
        let reason = match panic::catch_unwind(panic::AssertUnwindSafe(|| {
            inner.draw_text(text, style, pos)
        })) {
            Ok(Err(DrawingErrorKind::FontError(err))) => err.to_string(),
            Ok(result) => return result,
            Err(_) => "text rasterizer panicked".to_string(),
        };

        if !self.warned {
            warn!("No usable font ({}), drawing text with bitmap glyphs", reason);
            self.warned = true;
        }
        self.draw_glyphs(text, style, pos)
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        let inner = &self.inner;
        match panic::catch_unwind(panic::AssertUnwindSafe(|| {
            inner.estimate_text_size(text, style)
        })) {
            Ok(Ok(size)) => Ok(size),
            Ok(Err(DrawingErrorKind::DrawingError(err))) => Err(DrawingErrorKind::DrawingError(err)),
            _ => {
                let (w, h) = glyph_text_size(text, glyph_scale(style.size()));
                Ok((w as u32, h as u32))
            }
        }
    }
}

impl<DB: DrawingBackend> FontSafeBackend<DB> {
    fn draw_glyphs<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<DB::ErrorType>> {
        let color = style.color();
        if color.alpha == 0.0 || text.trim().is_empty() {
            return Ok(());
        }

        let scale = glyph_scale(style.size());
        let (width, height) = glyph_text_size(text, scale);
        let anchor = style.anchor();
        let left = match anchor.h_pos {
            HPos::Left => 0,
            HPos::Center => -width / 2,
            HPos::Right => -width,
        };
        let top = match anchor.v_pos {
            VPos::Top => 0,
            VPos::Center => -height / 2,
            VPos::Bottom => -height,
        };
        let transform = style.transform();

        let mut cursor = left;
        for ch in text.chars() {
            let Some((cols, rows)) = glyph(ch) else {
                cursor += SPACE_ADVANCE * scale;
                continue;
            };
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..cols {
                    if bits & (1 << (cols - 1 - col)) == 0 {
                        continue;
                    }
                    let x = cursor + i32::from(col) * scale;
                    let y = top + row as i32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let (tx, ty) = transform.transform(x + dx, y + dy);
                            self.inner.draw_pixel((pos.0 + tx, pos.1 + ty), color)?;
                        }
                    }
                }
            }
            cursor += (i32::from(cols) + 1) * scale;
        }
        Ok(())
    }
}

fn glyph_scale(font_size: f64) -> i32 {
    (font_size / PIXELS_PER_SIZE).round().max(1.0) as i32
}

/// Unrotated `(width, height)` of `text` drawn with bitmap glyphs.
fn glyph_text_size(text: &str, scale: i32) -> (i32, i32) {
    let advance: i32 = text
        .chars()
        .map(|ch| match glyph(ch) {
            Some((width, _)) => i32::from(width) + 1,
            None => SPACE_ADVANCE,
        })
        .sum();
    (((advance - 1).max(0)) * scale, GLYPH_ROWS as i32 * scale)
}

/// Column count and row bitmaps (most significant bit leftmost) of `ch`.
/// Letters are drawn in capitals.
fn glyph(ch: char) -> Option<(u8, [u8; GLYPH_ROWS])> {
    let bitmap = match ch.to_ascii_uppercase() {
        'A' => (5, [0x0e, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11]),
        'B' => (5, [0x1e, 0x11, 0x11, 0x1e, 0x11, 0x11, 0x1e]),
        'C' => (5, [0x0e, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0e]),
        'D' => (5, [0x1c, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1c]),
        'E' => (5, [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x1f]),
        'F' => (5, [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x10]),
        'G' => (5, [0x0e, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0f]),
        'H' => (5, [0x11, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11]),
        'I' => (3, [0x07, 0x02, 0x02, 0x02, 0x02, 0x02, 0x07]),
        'J' => (5, [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0c]),
        'K' => (5, [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11]),
        'L' => (5, [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1f]),
        'M' => (5, [0x11, 0x1b, 0x15, 0x11, 0x11, 0x11, 0x11]),
        'N' => (5, [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11]),
        'O' => (5, [0x0e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e]),
        'P' => (5, [0x1e, 0x11, 0x11, 0x1e, 0x10, 0x10, 0x10]),
        'Q' => (5, [0x0e, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0d]),
        'R' => (5, [0x1e, 0x11, 0x11, 0x1e, 0x14, 0x12, 0x11]),
        'S' => (5, [0x0f, 0x10, 0x10, 0x0e, 0x01, 0x01, 0x1e]),
        'T' => (5, [0x1f, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04]),
        'U' => (5, [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e]),
        'V' => (5, [0x11, 0x11, 0x11, 0x11, 0x0a, 0x0a, 0x04]),
        'W' => (5, [0x11, 0x11, 0x11, 0x11, 0x15, 0x1b, 0x11]),
        'X' => (5, [0x11, 0x11, 0x0a, 0x04, 0x0a, 0x11, 0x11]),
        'Y' => (5, [0x11, 0x11, 0x0a, 0x04, 0x04, 0x04, 0x04]),
        'Z' => (5, [0x1f, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1f]),
        '0' => (5, [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e]),
        '1' => (3, [0x02, 0x06, 0x02, 0x02, 0x02, 0x02, 0x07]),
        '2' => (5, [0x0e, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1f]),
        '3' => (5, [0x1e, 0x01, 0x01, 0x06, 0x01, 0x01, 0x1e]),
        '4' => (5, [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02]),
        '5' => (5, [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e]),
        '6' => (5, [0x0e, 0x11, 0x10, 0x1e, 0x11, 0x11, 0x0e]),
        '7' => (5, [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08]),
        '8' => (5, [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e]),
        '9' => (5, [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x11, 0x0e]),
        '-' | '–' => (3, [0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00]),
        '+' => (5, [0x00, 0x04, 0x04, 0x1f, 0x04, 0x04, 0x00]),
        '.' => (1, [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]),
        ',' => (2, [0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x02]),
        ':' => (1, [0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00]),
        ';' => (2, [0x00, 0x01, 0x00, 0x00, 0x01, 0x01, 0x02]),
        '\'' => (1, [0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]),
        '%' => (5, [0x19, 0x1a, 0x02, 0x04, 0x08, 0x0b, 0x13]),
        '&' => (5, [0x0c, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0d]),
        '/' => (3, [0x01, 0x01, 0x02, 0x02, 0x04, 0x04, 0x04]),
        '(' => (3, [0x01, 0x02, 0x04, 0x04, 0x04, 0x02, 0x01]),
        ')' => (3, [0x04, 0x02, 0x01, 0x01, 0x01, 0x02, 0x04]),
        '[' => (2, [0x03, 0x02, 0x02, 0x02, 0x02, 0x02, 0x03]),
        ']' => (2, [0x03, 0x01, 0x01, 0x01, 0x01, 0x01, 0x03]),
        _ => return None,
    };
    Some(bitmap)
}
