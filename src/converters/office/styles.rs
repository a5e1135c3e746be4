//! WordprocessingML units and style definitions.
//!
//! Word measures lengths in twentieths of a point (twips), font sizes in
//! half-points, border widths in eighths of a point and drawing extents in
//! EMU. Everything upstream is in points.

use crate::config::{ComposeConfig, Rgb};
use crate::layout::{BLOCK_GAP, BULLET_GAP, BULLET_INDENT, CAPTION_GAP};

/// Points to twips.
pub fn twips(points: f32) -> i64 {
    (points * 20.0).round() as i64
}

/// Points to English Metric Units.
pub fn emu(points: f32) -> i64 {
    (points * 12_700.0).round() as i64
}

/// Points to half-points (`w:sz`).
pub fn half_points(points: f32) -> u32 {
    (points * 2.0).round().max(1.0) as u32
}

/// Points to eighths of a point (`w:sz` of borders).
pub fn eighths(points: f32) -> u32 {
    (points * 8.0).round().max(1.0) as u32
}

/// Run formatting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in points
    pub size: f32,
    /// Bold face
    pub bold: bool,
    /// Text colour; the paragraph style colour when `None`
    pub color: Option<Rgb>,
}

impl TextStyle {
    /// Regular text of a size.
    pub fn new(size: f32) -> Self {
        Self {
            size,
            bold: false,
            color: None,
        }
    }

    /// Bold face.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Text colour.
    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }
}

/// Paragraph alignment options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParagraphAlignment {
    /// Left aligned
    #[default]
    Left,
    /// Centred
    Center,
}

impl ParagraphAlignment {
    /// `w:jc` value.
    pub fn value(&self) -> &'static str {
        match self {
            ParagraphAlignment::Left => "left",
            ParagraphAlignment::Center => "center",
        }
    }
}

/// Paragraph style identifiers defined by [`styles_xml`].
pub mod style_id {
    /// Section title
    pub const HEADING1: &str = "Heading1";
    /// Sub-heading
    pub const HEADING2: &str = "Heading2";
    /// Bullet item
    pub const LIST_BULLET: &str = "ListBullet";
    /// Photo caption
    pub const CAPTION: &str = "Caption";
    /// Header and footer text
    pub const BAND: &str = "Band";
}

/// Numbering instance used by bullet paragraphs.
pub const BULLET_NUM_ID: u32 = 1;

/// `word/styles.xml` for a configuration.
pub fn styles_xml(config: &ComposeConfig) -> String {
    let t = &config.typography;
    let p = &config.palette;
    // exact line heights keep Word close to the planned pagination
    let line = |size: f32| twips(t.line_height(size));

    let paragraph = |id: &str, name: &str, ppr: String, rpr: String| {
        format!(
            "<w:style w:type=\"paragraph\" w:styleId=\"{id}\"><w:name w:val=\"{name}\"/>\
             <w:basedOn w:val=\"Normal\"/><w:qFormat/><w:pPr>{ppr}</w:pPr><w:rPr>{rpr}</w:rPr></w:style>"
        )
    };

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
    );
    xml.push_str(&format!(
        "<w:docDefaults><w:rPrDefault><w:rPr>\
         <w:rFonts w:ascii=\"Helvetica\" w:hAnsi=\"Helvetica\" w:cs=\"Arial\" w:eastAsia=\"Arial\"/>\
         <w:color w:val=\"{}\"/><w:sz w:val=\"{}\"/><w:szCs w:val=\"{}\"/><w:lang w:val=\"fr-FR\"/>\
         </w:rPr></w:rPrDefault><w:pPrDefault><w:pPr>\
         <w:spacing w:before=\"0\" w:after=\"0\" w:line=\"{}\" w:lineRule=\"exact\"/>\
         </w:pPr></w:pPrDefault></w:docDefaults>",
        p.text.hex(),
        half_points(t.body_size),
        half_points(t.body_size),
        line(t.body_size)
    ));
    xml.push_str(
        "<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\">\
         <w:name w:val=\"Normal\"/><w:qFormat/></w:style>",
    );
    xml.push_str(&paragraph(
        style_id::HEADING1,
        "heading 1",
        format!(
            "<w:keepNext/><w:keepLines/><w:spacing w:before=\"0\" w:after=\"{}\" w:line=\"{}\" w:lineRule=\"exact\"/>\
             <w:outlineLvl w:val=\"0\"/>",
            twips(BLOCK_GAP),
            line(t.title_size)
        ),
        format!(
            "<w:b/><w:color w:val=\"FFFFFF\"/><w:sz w:val=\"{s}\"/><w:szCs w:val=\"{s}\"/>",
            s = half_points(t.title_size)
        ),
    ));
    xml.push_str(&paragraph(
        style_id::HEADING2,
        "heading 2",
        format!(
            "<w:keepNext/><w:spacing w:before=\"0\" w:after=\"{}\" w:line=\"{}\" w:lineRule=\"exact\"/>\
             <w:outlineLvl w:val=\"1\"/>",
            twips(BLOCK_GAP),
            line(t.subtitle_size)
        ),
        format!(
            "<w:b/><w:color w:val=\"{}\"/><w:sz w:val=\"{s}\"/><w:szCs w:val=\"{s}\"/>",
            p.secondary.hex(),
            s = half_points(t.subtitle_size)
        ),
    ));
    xml.push_str(&paragraph(
        style_id::LIST_BULLET,
        "List Bullet",
        format!(
            "<w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"{}\"/></w:numPr>\
             <w:spacing w:after=\"{}\"/><w:ind w:left=\"{}\" w:hanging=\"{}\"/>",
            BULLET_NUM_ID,
            twips(BULLET_GAP),
            twips(BULLET_INDENT),
            twips(BULLET_INDENT)
        ),
        String::new(),
    ));
    xml.push_str(&paragraph(
        style_id::CAPTION,
        "caption",
        format!(
            "<w:jc w:val=\"center\"/><w:spacing w:before=\"{}\" w:line=\"{}\" w:lineRule=\"exact\"/>",
            twips(CAPTION_GAP),
            line(t.caption_size)
        ),
        format!(
            "<w:color w:val=\"{}\"/><w:sz w:val=\"{s}\"/><w:szCs w:val=\"{s}\"/>",
            p.muted.hex(),
            s = half_points(t.caption_size)
        ),
    ));
    xml.push_str(&paragraph(
        style_id::BAND,
        "Band",
        format!(
            "<w:tabs><w:tab w:val=\"right\" w:pos=\"{}\"/></w:tabs>",
            twips(config.geometry.content_width())
        ),
        format!(
            "<w:color w:val=\"{}\"/><w:sz w:val=\"{s}\"/><w:szCs w:val=\"{s}\"/>",
            p.muted.hex(),
            s = half_points(t.header_footer_size)
        ),
    ));
    xml.push_str(
        "<w:style w:type=\"table\" w:default=\"1\" w:styleId=\"TableNormal\">\
         <w:name w:val=\"Normal Table\"/><w:tblPr><w:tblInd w:w=\"0\" w:type=\"dxa\"/>\
         <w:tblCellMar><w:top w:w=\"0\" w:type=\"dxa\"/><w:left w:w=\"0\" w:type=\"dxa\"/>\
         <w:bottom w:w=\"0\" w:type=\"dxa\"/><w:right w:w=\"0\" w:type=\"dxa\"/></w:tblCellMar>\
         </w:tblPr></w:style>",
    );
    xml.push_str("</w:styles>");
    xml
}

/// `word/numbering.xml` with the bullet list definition.
pub fn numbering_xml(bullet_color: Rgb) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:numbering xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:abstractNum w:abstractNumId=\"0\"><w:multiLevelType w:val=\"singleLevel\"/>\
         <w:lvl w:ilvl=\"0\"><w:start w:val=\"1\"/><w:numFmt w:val=\"bullet\"/>\
         <w:lvlText w:val=\"\u{2022}\"/><w:lvlJc w:val=\"left\"/>\
         <w:pPr><w:ind w:left=\"{ind}\" w:hanging=\"{ind}\"/></w:pPr>\
         <w:rPr><w:color w:val=\"{}\"/></w:rPr></w:lvl></w:abstractNum>\
         <w:num w:numId=\"{}\"><w:abstractNumId w:val=\"0\"/></w:num></w:numbering>",
        bullet_color.hex(),
        BULLET_NUM_ID,
        ind = twips(BULLET_INDENT)
    )
}
