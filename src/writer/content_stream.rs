//! PDF content stream builder.
//!
//! Builds PDF content streams containing graphics and text operators
//! according to PDF specification ISO 32000-1:2008 Section 8-9. Coordinates
//! are in PDF user space (origin at the bottom-left corner).

use crate::config::Rgb;

/// Operations that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStreamOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Set transformation matrix (cm)
    Transform(f32, f32, f32, f32, f32, f32),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font resource and size (Tf)
    SetFont(String, f32),
    /// Move text position (Td)
    MoveText(f32, f32),
    /// Show text (Tj), WinAnsi-encoded on output
    ShowText(String),
    /// Set fill color RGB (rg)
    SetFillColorRGB(f32, f32, f32),
    /// Set stroke color RGB (RG)
    SetStrokeColorRGB(f32, f32, f32),
    /// Set line width (w)
    SetLineWidth(f32),
    /// Move to (m)
    MoveTo(f32, f32),
    /// Line to (l)
    LineTo(f32, f32),
    /// Cubic Bézier curve (c)
    CurveTo(f32, f32, f32, f32, f32, f32),
    /// Rectangle (re)
    Rectangle(f32, f32, f32, f32),
    /// Close subpath (h)
    ClosePath,
    /// Stroke path (S)
    Stroke,
    /// Fill path (f)
    Fill,
    /// Paint an image XObject (Do)
    PaintXObject(String),
    /// Begin marked content with an `/Id` property (BDC)
    BeginMarkedContentDict {
        /// Structure tag
        tag: String,
        /// Identifier written as a string property
        id: String,
    },
    /// End marked content (EMC)
    EndMarkedContent,
}

/// Builder for PDF content streams.
#[derive(Debug, Clone, Default)]
pub struct ContentStreamBuilder {
    operations: Vec<ContentStreamOp>,
}

impl ContentStreamBuilder {
    /// Create a new content stream builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw operation.
    pub fn op(&mut self, op: ContentStreamOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Operations recorded so far.
    pub fn operations(&self) -> &[ContentStreamOp] {
        &self.operations
    }

    /// Save graphics state.
    pub fn save_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::SaveState)
    }

    /// Restore graphics state.
    pub fn restore_state(&mut self) -> &mut Self {
        self.op(ContentStreamOp::RestoreState)
    }

    /// Concatenate a transformation matrix.
    pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> &mut Self {
        self.op(ContentStreamOp::Transform(a, b, c, d, e, f))
    }

    /// Draw a single line of text with its baseline at `(x, y)`.
    pub fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str) -> &mut Self {
        self.op(ContentStreamOp::BeginText)
            .op(ContentStreamOp::SetFont(font.to_string(), size))
            .op(ContentStreamOp::MoveText(x, y))
            .op(ContentStreamOp::ShowText(text.to_string()))
            .op(ContentStreamOp::EndText)
    }

    /// Set the fill colour.
    pub fn fill_color(&mut self, color: Rgb) -> &mut Self {
        let (r, g, b) = color.to_pdf();
        self.op(ContentStreamOp::SetFillColorRGB(r, g, b))
    }

    /// Set the stroke colour.
    pub fn stroke_color(&mut self, color: Rgb) -> &mut Self {
        let (r, g, b) = color.to_pdf();
        self.op(ContentStreamOp::SetStrokeColorRGB(r, g, b))
    }

    /// Set line width.
    pub fn set_line_width(&mut self, width: f32) -> &mut Self {
        self.op(ContentStreamOp::SetLineWidth(width))
    }

    /// Move to point.
    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.op(ContentStreamOp::MoveTo(x, y))
    }

    /// Line to point.
    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.op(ContentStreamOp::LineTo(x, y))
    }

    /// Draw a Bézier curve.
    pub fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32) -> &mut Self {
        self.op(ContentStreamOp::CurveTo(x1, y1, x2, y2, x3, y3))
    }

    /// Add a rectangle path.
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.op(ContentStreamOp::Rectangle(x, y, width, height))
    }

    /// Close the current subpath.
    pub fn close_path(&mut self) -> &mut Self {
        self.op(ContentStreamOp::ClosePath)
    }

    /// Stroke the path.
    pub fn stroke(&mut self) -> &mut Self {
        self.op(ContentStreamOp::Stroke)
    }

    /// Fill the path.
    pub fn fill(&mut self) -> &mut Self {
        self.op(ContentStreamOp::Fill)
    }

    /// Paint an image XObject scaled into `(x, y, width, height)`.
    pub fn draw_image(&mut self, name: &str, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        self.save_state()
            .transform(width, 0.0, 0.0, height, x, y)
            .op(ContentStreamOp::PaintXObject(name.to_string()))
            .restore_state()
    }

    /// Open a marked-content sequence tagged with an identifier.
    pub fn begin_marked(&mut self, tag: &str, id: &str) -> &mut Self {
        self.op(ContentStreamOp::BeginMarkedContentDict {
            tag: tag.to_string(),
            id: id.to_string(),
        })
    }

    /// Close the current marked-content sequence.
    pub fn end_marked(&mut self) -> &mut Self {
        self.op(ContentStreamOp::EndMarkedContent)
    }

    /// Draw a rounded rectangle; `y` is the lower edge.
    pub fn rounded_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
    ) -> &mut Self {
        let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
        if r == 0.0 {
            return self.rect(x, y, width, height);
        }
        let k = r * 0.552_284_8;

        self.move_to(x + r, y)
            .line_to(x + width - r, y)
            .curve_to(x + width - r + k, y, x + width, y + k, x + width, y + r)
            .line_to(x + width, y + height - r)
            .curve_to(
                x + width,
                y + height - r + k,
                x + width - k,
                y + height,
                x + width - r,
                y + height,
            )
            .line_to(x + r, y + height)
            .curve_to(x + r - k, y + height, x, y + height - k, x, y + height - r)
            .line_to(x, y + r)
            .curve_to(x, y + r - k, x + r - k, y, x + r, y)
            .close_path()
    }

    /// Build the content stream to bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for op in &self.operations {
            write_op(&mut buf, op);
            buf.push(b'\n');
        }
        buf
    }
}

/// Format a coordinate with at most three decimals.
fn num(value: f32) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 {
        return format!("{}", rounded as i64);
    }
    let formatted = format!("{:.3}", rounded);
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn nums(values: &[f32]) -> String {
    values.iter().map(|v| num(*v)).collect::<Vec<_>>().join(" ")
}

fn write_op(w: &mut Vec<u8>, op: &ContentStreamOp) {
    let text = match op {
        ContentStreamOp::SaveState => "q".to_string(),
        ContentStreamOp::RestoreState => "Q".to_string(),
        ContentStreamOp::Transform(a, b, c, d, e, f) => format!("{} cm", nums(&[*a, *b, *c, *d, *e, *f])),
        ContentStreamOp::BeginText => "BT".to_string(),
        ContentStreamOp::EndText => "ET".to_string(),
        ContentStreamOp::SetFont(name, size) => format!("/{} {} Tf", name, num(*size)),
        ContentStreamOp::MoveText(tx, ty) => format!("{} Td", nums(&[*tx, *ty])),
        ContentStreamOp::ShowText(text) => {
            w.push(b'(');
            write_escaped(w, &encode_win_ansi(text));
            w.extend_from_slice(b") Tj");
            return;
        },
        ContentStreamOp::SetFillColorRGB(r, g, b) => format!("{} rg", nums(&[*r, *g, *b])),
        ContentStreamOp::SetStrokeColorRGB(r, g, b) => format!("{} RG", nums(&[*r, *g, *b])),
        ContentStreamOp::SetLineWidth(width) => format!("{} w", num(*width)),
        ContentStreamOp::MoveTo(x, y) => format!("{} m", nums(&[*x, *y])),
        ContentStreamOp::LineTo(x, y) => format!("{} l", nums(&[*x, *y])),
        ContentStreamOp::CurveTo(x1, y1, x2, y2, x3, y3) => {
            format!("{} c", nums(&[*x1, *y1, *x2, *y2, *x3, *y3]))
        },
        ContentStreamOp::Rectangle(x, y, width, height) => {
            format!("{} re", nums(&[*x, *y, *width, *height]))
        },
        ContentStreamOp::ClosePath => "h".to_string(),
        ContentStreamOp::Stroke => "S".to_string(),
        ContentStreamOp::Fill => "f".to_string(),
        ContentStreamOp::PaintXObject(name) => format!("/{} Do", name),
        ContentStreamOp::BeginMarkedContentDict { tag, id } => {
            w.extend_from_slice(format!("/{} <</Id (", tag).as_bytes());
            write_escaped(w, &encode_win_ansi(id));
            w.extend_from_slice(b")>> BDC");
            return;
        },
        ContentStreamOp::EndMarkedContent => "EMC".to_string(),
    };
    w.extend_from_slice(text.as_bytes());
}

/// Escape the delimiters of a literal string.
fn write_escaped(w: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        match byte {
            b'(' => w.extend_from_slice(b"\\("),
            b')' => w.extend_from_slice(b"\\)"),
            b'\\' => w.extend_from_slice(b"\\\\"),
            b'\n' => w.extend_from_slice(b"\\n"),
            b'\r' => w.extend_from_slice(b"\\r"),
            b'\t' => w.extend_from_slice(b"\\t"),
            _ => w.push(byte),
        }
    }
}

/// Encode text as WinAnsiEncoding bytes for the Base-14 fonts.
///
/// Latin-1 maps to itself, the typographic characters of the 0x80-0x9F block
/// are remapped and anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        '\u{00A0}' => b' ',
        c if c.is_control() => b' ',
        c if (c as u32) < 0x80 => c as u8,
        c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
        _ => b'?',
    }
}
