//! Font metrics for PDF generation.
//!
//! Output uses the two Base-14 Helvetica faces with WinAnsiEncoding, so no
//! font program is embedded. Widths come from the Adobe AFM files and are
//! expressed in 1/1000 of the font size.

use super::table_renderer::FontMetrics;

/// A Base-14 face used by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Base14Font {
    /// Helvetica
    Helvetica,
    /// Helvetica-Bold
    HelveticaBold,
}

impl Base14Font {
    /// Faces in resource order.
    pub const ALL: [Base14Font; 2] = [Base14Font::Helvetica, Base14Font::HelveticaBold];

    /// PostScript name written as `/BaseFont`.
    pub fn base_font(&self) -> &'static str {
        match self {
            Base14Font::Helvetica => "Helvetica",
            Base14Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Name of the font in page resource dictionaries (`/HelveticaBold 10 Tf`).
    pub fn resource_name(&self) -> &'static str {
        match self {
            Base14Font::Helvetica => "Helvetica",
            Base14Font::HelveticaBold => "HelveticaBold",
        }
    }

    /// Regular or bold face.
    pub fn select(bold: bool) -> Self {
        if bold {
            Base14Font::HelveticaBold
        } else {
            Base14Font::Helvetica
        }
    }

    /// Width of one character in font units.
    pub fn char_width(&self, ch: char) -> f32 {
        let table = match self {
            Base14Font::Helvetica => &HELVETICA_WIDTHS,
            Base14Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        let code = ch as u32;
        if (32..=126).contains(&code) {
            return table[(code - 32) as usize] as f32;
        }
        if let Some(width) = special_width(ch, *self) {
            return width;
        }
        match fold_to_ascii(ch) {
            Some(base) => self.char_width(base),
            None => 556.0,
        }
    }

    /// Width of text in points.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: f32 = text.chars().map(|c| self.char_width(c)).sum();
        units * font_size / 1000.0
    }
}

/// Helvetica AFM widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold AFM widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn special_width(ch: char, font: Base14Font) -> Option<f32> {
    let width = match ch {
        '\u{20AC}' | '\u{2013}' | '\u{00AB}' | '\u{00BB}' => 556.0,
        '\u{2019}' | '\u{2018}' => {
            if font == Base14Font::HelveticaBold {
                278.0
            } else {
                222.0
            }
        },
        '\u{201C}' | '\u{201D}' => 333.0,
        '\u{2014}' => 1000.0,
        '\u{2026}' => 1000.0,
        '\u{2022}' => 350.0,
        '\u{0153}' => 944.0,
        '\u{0152}' => 1000.0,
        '\u{00B0}' => 400.0,
        '\u{00A0}' => 278.0,
        '\u{00E6}' => 889.0,
        '\u{00C6}' => 1000.0,
        '\u{00DF}' => 611.0,
        _ => return None,
    };
    Some(width)
}

/// Latin letters with diacritics share the width of their base letter.
fn fold_to_ascii(ch: char) -> Option<char> {
    use unicode_normalization::UnicodeNormalization;
    std::iter::once(ch)
        .nfd()
        .next()
        .filter(|base| base.is_ascii() && *base != ch)
}

/// Base-14 Helvetica metrics, optionally widened.
///
/// A `scale` above 1.0 reserves room for fallback fonts in renderers that do
/// not control the exact face (the browser picks from a font stack).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Base14Metrics {
    scale: f32,
}

impl Default for Base14Metrics {
    fn default() -> Self {
        Self::helvetica()
    }
}

impl Base14Metrics {
    /// Exact Helvetica widths.
    pub fn helvetica() -> Self {
        Self { scale: 1.0 }
    }

    /// Helvetica widths multiplied by `scale`.
    pub fn scaled(scale: f32) -> Self {
        Self { scale }
    }
}

impl FontMetrics for Base14Metrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        Base14Font::Helvetica.text_width(text, font_size) * self.scale
    }

    fn bold_text_width(&self, text: &str, font_size: f32) -> f32 {
        Base14Font::HelveticaBold.text_width(text, font_size) * self.scale
    }
}
