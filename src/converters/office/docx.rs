//! DOCX renderer.
//!
//! Each plan page becomes a run of paragraphs and tables terminated by an
//! explicit page break. Body pages share one section whose header and
//! footer parts draw the bands; the closing page sits in a second section
//! without bands.

use super::package::{
    CoreProperties, MediaPart, Package, Relationships, XmlWriter, NS_A, NS_PIC, NS_R, NS_W, NS_WP,
};
use super::styles::{
    eighths, emu, half_points, numbering_xml, style_id, styles_xml, twips, ParagraphAlignment,
    TextStyle,
};
use super::Margins;
use crate::assets::AssetName;
use crate::compose::Target;
use crate::config::Rgb;
use crate::converters::{accent_color, placed_images, portable_image, RenderContext, Renderer};
use crate::error::{Error, Result};
use crate::geometry::{fit_within, PageGeometry};
use crate::layout::{
    build_table, Page, PageKind, PagePlan, PlacedContent, PlacedImage, Placement, TextLine,
    BLOCK_GAP, GUTTER,
};
use crate::model::{ImageId, ImageInfo};
use crate::sections::{Block, ImageBlock, ImageLayout, TableBlock};
use crate::writer::{Base14Metrics, FontMetrics, TableLayout};
use std::collections::{BTreeMap, BTreeSet};

const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);

const REL_STYLES: &str = "rId1";
const REL_NUMBERING: &str = "rId2";
const REL_HEADER: &str = "rId3";
const REL_FOOTER: &str = "rId4";

/// First `wp:docPr` id of each part; ids must be unique across the package.
const DOCUMENT_DRAWINGS: u32 = 1;
const HEADER_DRAWINGS: u32 = 9001;
const FOOTER_DRAWINGS: u32 = 9501;

/// Space above the fallback cover title.
const COVER_OFFSET: f32 = 120.0;

/// Renders the Office (DOCX) target.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxRenderer;

impl DocxRenderer {
    /// Create a renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DocxRenderer {
    fn target(&self) -> Target {
        Target::Office
    }

    fn metrics(&self) -> Box<dyn FontMetrics> {
        Box::new(Base14Metrics::helvetica())
    }

    fn render(&self, context: &RenderContext<'_>, plan: &PagePlan) -> Result<Vec<u8>> {
        let config = context.config;

        let mut media = MediaStore::default();
        for placed in plan.placements().flat_map(placed_images) {
            if media.photos.contains_key(&placed.id) {
                continue;
            }
            let index = media.push(context.image_data(placed.id.index())?)?;
            media.photos.insert(placed.id, index);
        }
        for name in context.assets.names() {
            let Some(asset) = context.assets.get(name) else {
                continue;
            };
            match media.push(&asset.data) {
                Ok(index) => {
                    media.assets.insert(name, (index, asset.info));
                },
                Err(e) => log::warn!("Asset {} cannot be embedded ({}), using text", name, e),
            }
        }

        let mut document_rels = Relationships::default();
        document_rels.add(REL_STYLES, "styles", "styles.xml");
        document_rels.add(REL_NUMBERING, "numbering", "numbering.xml");
        document_rels.add(REL_HEADER, "header", "header1.xml");
        document_rels.add(REL_FOOTER, "footer", "footer1.xml");

        let mut part = PartWriter::new(context, &media, DOCUMENT_DRAWINGS)?;
        part.document(plan)?;
        let (document, document_rels) = part.finish(document_rels);

        let band_page = plan.pages.iter().find(|p| p.kind == PageKind::Body);

        let mut part = PartWriter::new(context, &media, HEADER_DRAWINGS)?;
        part.header(band_page)?;
        let (header, header_rels) = part.finish(Relationships::default());

        let mut part = PartWriter::new(context, &media, FOOTER_DRAWINGS)?;
        part.footer(band_page, plan.total_pages())?;
        let (footer, footer_rels) = part.finish(Relationships::default());

        let timestamp = config.office.timestamp.clone().unwrap_or_else(|| {
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
        });
        let core = CoreProperties {
            title: context.document_title(),
            subject: config.branding.report_title.clone(),
            creator: config.branding.company_name.clone(),
            timestamp,
        };

        log::debug!(
            "DOCX: {} pages, {} media parts",
            plan.total_pages(),
            media.parts.len()
        );
        Package {
            document,
            document_rels,
            styles: styles_xml(config),
            numbering: numbering_xml(config.palette.secondary),
            header,
            header_rels,
            footer,
            footer_rels,
            media: media.parts,
            core,
        }
        .write()
    }
}

/// Images stored in the package, shared by all parts.
#[derive(Debug, Default)]
struct MediaStore {
    parts: Vec<MediaPart>,
    photos: BTreeMap<ImageId, usize>,
    assets: BTreeMap<AssetName, (usize, ImageInfo)>,
}

impl MediaStore {
    fn push(&mut self, data: &[u8]) -> Result<usize> {
        let (kind, data) = portable_image(data)?;
        let n = self.parts.len() + 1;
        self.parts.push(MediaPart {
            file_name: format!("image{}.{}", n, kind.extension()),
            rel_id: format!("rIdImg{}", n),
            kind,
            data,
        });
        Ok(n - 1)
    }

    fn asset(&self, name: AssetName) -> Option<(usize, ImageInfo)> {
        self.assets.get(&name).copied()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ParagraphProps<'s> {
    style: Option<&'s str>,
    keep_next: bool,
    /// Side, colour and width of a single paragraph border
    border: Option<(&'static str, Rgb, f32)>,
    shading: Option<Rgb>,
    before: Option<f32>,
    after: Option<f32>,
    /// Exact line height
    line: Option<f32>,
    align: Option<ParagraphAlignment>,
}

impl<'s> ParagraphProps<'s> {
    fn styled(style: &'s str) -> Self {
        Self {
            style: Some(style),
            ..Self::default()
        }
    }

    fn after(mut self, points: f32) -> Self {
        self.after = Some(points);
        self
    }

    fn align(mut self, align: ParagraphAlignment) -> Self {
        self.align = Some(align);
        self
    }
}

fn namespaces() -> [(&'static str, &'static str); 5] {
    [
        ("xmlns:w", NS_W),
        ("xmlns:r", NS_R),
        ("xmlns:wp", NS_WP),
        ("xmlns:a", NS_A),
        ("xmlns:pic", NS_PIC),
    ]
}

fn as_attrs<'v>(pairs: &'v [(&'v str, String)]) -> Vec<(&'v str, &'v str)> {
    pairs.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

/// Writer for one WordprocessingML part.
struct PartWriter<'c, 'a> {
    xml: XmlWriter,
    context: &'c RenderContext<'a>,
    media: &'c MediaStore,
    /// Media parts referenced from this part
    used: BTreeSet<usize>,
    next_drawing: u32,
    next_bookmark: u32,
}

impl<'c, 'a> PartWriter<'c, 'a> {
    fn new(
        context: &'c RenderContext<'a>,
        media: &'c MediaStore,
        first_drawing: u32,
    ) -> Result<Self> {
        Ok(Self {
            xml: XmlWriter::new()?,
            context,
            media,
            used: BTreeSet::new(),
            next_drawing: first_drawing,
            next_bookmark: 0,
        })
    }

    /// Part bytes and its relationships, image references appended.
    fn finish(self, mut rels: Relationships) -> (Vec<u8>, Relationships) {
        for index in &self.used {
            let part = &self.media.parts[*index];
            rels.add(part.rel_id.clone(), "image", format!("media/{}", part.file_name));
        }
        (self.xml.finish(), rels)
    }

    fn geometry(&self) -> PageGeometry {
        self.context.config.geometry
    }

    // -- primitives -------------------------------------------------------

    fn paragraph_properties(&mut self, props: &ParagraphProps<'_>) -> Result<()> {
        self.xml.open("w:pPr", &[])?;
        self.paragraph_property_children(props)?;
        self.xml.close("w:pPr")
    }

    /// `w:pPr` children in schema order.
    fn paragraph_property_children(&mut self, props: &ParagraphProps<'_>) -> Result<()> {
        if let Some(style) = props.style {
            self.xml.empty("w:pStyle", &[("w:val", style)])?;
        }
        if props.keep_next {
            self.xml.empty("w:keepNext", &[])?;
        }
        if let Some((side, color, width)) = props.border {
            let sz = eighths(width).to_string();
            let color = color.hex();
            self.xml.open("w:pBdr", &[])?;
            self.xml.empty(
                &format!("w:{}", side),
                &[("w:val", "single"), ("w:sz", &sz), ("w:space", "4"), ("w:color", &color)],
            )?;
            self.xml.close("w:pBdr")?;
        }
        if let Some(fill) = props.shading {
            self.shading(fill)?;
        }
        if props.before.is_some() || props.after.is_some() || props.line.is_some() {
            let mut spacing = Vec::new();
            if let Some(before) = props.before {
                spacing.push(("w:before", twips(before).to_string()));
            }
            if let Some(after) = props.after {
                spacing.push(("w:after", twips(after).to_string()));
            }
            if let Some(line) = props.line {
                spacing.push(("w:line", twips(line).to_string()));
                spacing.push(("w:lineRule", "exact".to_string()));
            }
            self.xml.empty("w:spacing", &as_attrs(&spacing))?;
        }
        if let Some(align) = props.align {
            self.xml.empty("w:jc", &[("w:val", align.value())])?;
        }
        Ok(())
    }

    fn shading(&mut self, fill: Rgb) -> Result<()> {
        let fill = fill.hex();
        self.xml
            .empty("w:shd", &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", &fill)])
    }

    fn run(&mut self, text: &str, style: Option<TextStyle>) -> Result<()> {
        self.xml.open("w:r", &[])?;
        if let Some(style) = style {
            self.xml.open("w:rPr", &[])?;
            if style.bold {
                self.xml.empty("w:b", &[])?;
            }
            if let Some(color) = style.color {
                self.xml.empty("w:color", &[("w:val", &color.hex())])?;
            }
            let size = half_points(style.size).to_string();
            self.xml.empty("w:sz", &[("w:val", &size)])?;
            self.xml.empty("w:szCs", &[("w:val", &size)])?;
            self.xml.close("w:rPr")?;
        }
        self.xml.leaf("w:t", &[("xml:space", "preserve")], text)?;
        self.xml.close("w:r")
    }

    fn paragraph(
        &mut self,
        props: &ParagraphProps<'_>,
        text: &str,
        style: Option<TextStyle>,
    ) -> Result<()> {
        self.xml.open("w:p", &[])?;
        self.paragraph_properties(props)?;
        if !text.is_empty() {
            self.run(text, style)?;
        }
        self.xml.close("w:p")
    }

    fn empty_paragraph(&mut self) -> Result<()> {
        self.xml.empty("w:p", &[])
    }

    /// Exact-height empty paragraph separating blocks.
    fn spacer(&mut self, height: f32) -> Result<()> {
        let props = ParagraphProps {
            line: Some(height),
            ..ParagraphProps::default()
        };
        self.paragraph(&props, "", None)
    }

    fn page_break(&mut self) -> Result<()> {
        self.xml.open("w:p", &[])?;
        self.paragraph_properties(&ParagraphProps {
            line: Some(1.0),
            ..ParagraphProps::default()
        })?;
        self.xml.open("w:r", &[])?;
        self.xml.empty("w:br", &[("w:type", "page")])?;
        self.xml.close("w:r")?;
        self.xml.close("w:p")
    }

    /// Inline picture run.
    fn drawing(&mut self, index: usize, width: f32, height: f32, description: &str) -> Result<()> {
        let media = self.media;
        let part = media
            .parts
            .get(index)
            .ok_or_else(|| Error::Layout(format!("media part {} was not registered", index)))?;
        self.used.insert(index);
        let id = self.next_drawing.to_string();
        self.next_drawing += 1;
        let (cx, cy) = (emu(width).to_string(), emu(height).to_string());
        let name = format!("Picture {}", id);

        self.xml.open("w:r", &[])?;
        self.xml.open("w:drawing", &[])?;
        self.xml.open(
            "wp:inline",
            &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
        )?;
        self.xml.empty("wp:extent", &[("cx", &cx), ("cy", &cy)])?;
        self.xml
            .empty("wp:docPr", &[("id", &id), ("name", &name), ("descr", description)])?;
        self.xml.open("a:graphic", &[])?;
        self.xml.open(
            "a:graphicData",
            &[("uri", "http://schemas.openxmlformats.org/drawingml/2006/picture")],
        )?;
        self.xml.open("pic:pic", &[])?;
        self.xml.open("pic:nvPicPr", &[])?;
        self.xml
            .empty("pic:cNvPr", &[("id", &id), ("name", part.file_name.as_str())])?;
        self.xml.empty("pic:cNvPicPr", &[])?;
        self.xml.close("pic:nvPicPr")?;
        self.xml.open("pic:blipFill", &[])?;
        self.xml.empty("a:blip", &[("r:embed", part.rel_id.as_str())])?;
        self.xml.open("a:stretch", &[])?;
        self.xml.empty("a:fillRect", &[])?;
        self.xml.close("a:stretch")?;
        self.xml.close("pic:blipFill")?;
        self.xml.open("pic:spPr", &[])?;
        self.xml.open("a:xfrm", &[])?;
        self.xml.empty("a:off", &[("x", "0"), ("y", "0")])?;
        self.xml.empty("a:ext", &[("cx", &cx), ("cy", &cy)])?;
        self.xml.close("a:xfrm")?;
        self.xml.open("a:prstGeom", &[("prst", "rect")])?;
        self.xml.empty("a:avLst", &[])?;
        self.xml.close("a:prstGeom")?;
        self.xml.close("pic:spPr")?;
        self.xml.close("pic:pic")?;
        self.xml.close("a:graphicData")?;
        self.xml.close("a:graphic")?;
        self.xml.close("wp:inline")?;
        self.xml.close("w:drawing")?;
        self.xml.close("w:r")
    }

    fn picture_paragraph(
        &mut self,
        props: &ParagraphProps<'_>,
        index: usize,
        width: f32,
        height: f32,
        description: &str,
    ) -> Result<()> {
        self.xml.open("w:p", &[])?;
        self.paragraph_properties(props)?;
        self.drawing(index, width, height, description)?;
        self.xml.close("w:p")
    }

    fn section_properties(&mut self, bands: bool, title_page: bool) -> Result<()> {
        let g = self.geometry();
        let m = Margins::from_geometry(&g);
        self.xml.open("w:sectPr", &[])?;
        if bands {
            self.xml
                .empty("w:headerReference", &[("w:type", "default"), ("r:id", REL_HEADER)])?;
            self.xml
                .empty("w:footerReference", &[("w:type", "default"), ("r:id", REL_FOOTER)])?;
        }
        let size = [
            ("w:w", twips(g.width).to_string()),
            ("w:h", twips(g.height).to_string()),
        ];
        self.xml.empty("w:pgSz", &as_attrs(&size))?;
        let margins = [
            ("w:top", twips(m.top).to_string()),
            ("w:right", twips(m.right).to_string()),
            ("w:bottom", twips(m.bottom).to_string()),
            ("w:left", twips(m.left).to_string()),
            ("w:header", twips(m.header).to_string()),
            ("w:footer", twips(m.footer).to_string()),
            ("w:gutter", "0".to_string()),
        ];
        self.xml.empty("w:pgMar", &as_attrs(&margins))?;
        if title_page {
            self.xml.empty("w:titlePg", &[])?;
        }
        self.xml.close("w:sectPr")
    }

    /// Ends the body section; the following content starts a new page.
    fn section_break(&mut self, title_page: bool) -> Result<()> {
        self.xml.open("w:p", &[])?;
        self.xml.open("w:pPr", &[])?;
        self.paragraph_property_children(&ParagraphProps {
            line: Some(1.0),
            ..ParagraphProps::default()
        })?;
        self.section_properties(true, title_page)?;
        self.xml.close("w:pPr")?;
        self.xml.close("w:p")
    }

    // -- document ---------------------------------------------------------

    fn document(&mut self, plan: &PagePlan) -> Result<()> {
        self.xml.open("w:document", &namespaces())?;
        self.xml.open("w:body", &[])?;

        let has_cover = plan.pages.first().is_some_and(|p| p.kind == PageKind::Cover);
        for (i, page) in plan.pages.iter().enumerate() {
            if i > 0 {
                if page.kind == PageKind::Closing {
                    self.section_break(has_cover)?;
                } else {
                    self.page_break()?;
                }
            }
            match page.kind {
                PageKind::Cover => self.cover(plan)?,
                PageKind::Closing => self.closing(plan)?,
                PageKind::Body => {
                    for placement in &page.placements {
                        self.placement(placement)?;
                    }
                },
            }
        }

        let closing_section =
            plan.pages.len() > 1 && plan.pages.last().is_some_and(|p| p.kind == PageKind::Closing);
        if closing_section {
            // no references: the closing page inherits no bands through titlePg
            self.section_properties(false, true)?;
        } else {
            self.section_properties(true, has_cover)?;
        }

        self.xml.close("w:body")?;
        self.xml.close("w:document")
    }

    fn cover(&mut self, plan: &PagePlan) -> Result<()> {
        let g = self.geometry();
        if let Some((index, info)) = self.media.asset(AssetName::Cover) {
            let (w, h) =
                fit_within(info.width as f32, info.height as f32, g.content_width(), g.body_height());
            let props = ParagraphProps::default().align(ParagraphAlignment::Center);
            return self.picture_paragraph(&props, index, w, h, "Cover");
        }
        let Some(cover) = &plan.cover else {
            return Ok(());
        };
        let config = self.context.config;
        let typo = &config.typography;
        let band = ParagraphProps {
            shading: Some(config.palette.primary),
            before: Some(COVER_OFFSET),
            line: Some(typo.line_height(typo.cover_title_size)),
            ..ParagraphProps::default()
        };
        let title = TextStyle::new(typo.cover_title_size).bold().color(WHITE);
        self.paragraph(&band, &cover.title, Some(title))?;

        let line_props = ParagraphProps {
            shading: Some(config.palette.primary),
            line: Some(typo.line_height(typo.subtitle_size)),
            ..ParagraphProps::default()
        };
        for line in &cover.lines {
            let style = TextStyle::new(typo.subtitle_size).color(WHITE);
            self.paragraph(&line_props, line, Some(style))?;
        }
        Ok(())
    }

    fn closing(&mut self, plan: &PagePlan) -> Result<()> {
        let g = self.geometry();
        if let Some((index, info)) = self.media.asset(AssetName::Closing) {
            let (w, h) =
                fit_within(info.width as f32, info.height as f32, g.content_width(), g.body_height());
            let props = ParagraphProps::default().align(ParagraphAlignment::Center);
            return self.picture_paragraph(&props, index, w, h, "Closing");
        }
        let Some(closing) = &plan.closing else {
            return Ok(());
        };
        let config = self.context.config;
        let typo = &config.typography;
        let lh = typo.line_height(typo.subtitle_size);
        let offset = (g.body_height() - closing.lines.len() as f32 * lh) / 2.0;

        for (i, line) in closing.lines.iter().enumerate() {
            let props = ParagraphProps {
                before: (i == 0).then_some(offset.max(0.0)),
                line: Some(lh),
                align: Some(ParagraphAlignment::Center),
                ..ParagraphProps::default()
            };
            let style = if i == 0 {
                TextStyle::new(typo.subtitle_size)
                    .bold()
                    .color(config.palette.primary)
            } else {
                TextStyle::new(typo.subtitle_size).color(config.palette.text)
            };
            self.paragraph(&props, line, Some(style))?;
        }
        Ok(())
    }

    fn placement(&mut self, placement: &Placement) -> Result<()> {
        let block = self.context.block(placement.block)?;
        let palette = &self.context.config.palette;

        match (block, &placement.content) {
            (Block::SectionTitle { section, text, accent }, PlacedContent::Heading { .. }) => {
                let props = ParagraphProps {
                    shading: Some(accent_color(*accent, palette)),
                    ..ParagraphProps::styled(style_id::HEADING1)
                };
                let id = self.next_bookmark.to_string();
                self.next_bookmark += 1;
                let name = format!("section-{}", section.key());

                self.xml.open("w:p", &[])?;
                self.paragraph_properties(&props)?;
                self.xml
                    .empty("w:bookmarkStart", &[("w:id", &id), ("w:name", &name)])?;
                self.run(text, None)?;
                self.xml.empty("w:bookmarkEnd", &[("w:id", &id)])?;
                self.xml.close("w:p")
            },
            (Block::Subtitle { text, accent }, PlacedContent::Heading { .. }) => {
                let typo = &self.context.config.typography;
                let style = TextStyle::new(typo.subtitle_size)
                    .bold()
                    .color(accent_color(*accent, palette));
                self.paragraph(&ParagraphProps::styled(style_id::HEADING2), text, Some(style))
            },
            (Block::Table(table), PlacedContent::Table { layout }) => self.table(table, layout),
            (Block::BulletList(_), PlacedContent::Bullets { items }) => self.bullets(items),
            (Block::Image(figures), PlacedContent::Images(images)) => {
                self.figures(figures, images, placement.scale)
            },
            (Block::FreeText(_), PlacedContent::TextLines(lines)) => self.free_text(lines),
            (block, _) => Err(Error::Layout(format!(
                "placed content does not match {} block #{}",
                block.kind_name(),
                placement.block
            ))),
        }
    }

    fn table(&mut self, block: &TableBlock, layout: &TableLayout) -> Result<()> {
        let config = self.context.config;
        let table = build_table(block, &config.typography, &config.palette);
        let style = &table.style;
        let border_color = config.palette.border.hex();
        let border_size = eighths(0.5).to_string();

        self.xml.open("w:tbl", &[])?;
        self.xml.open("w:tblPr", &[])?;
        let width = twips(layout.total_width).to_string();
        self.xml.empty("w:tblW", &[("w:w", &width), ("w:type", "dxa")])?;
        self.xml.open("w:tblBorders", &[])?;
        for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            self.xml.empty(
                side,
                &[
                    ("w:val", "single"),
                    ("w:sz", &border_size),
                    ("w:space", "0"),
                    ("w:color", &border_color),
                ],
            )?;
        }
        self.xml.close("w:tblBorders")?;
        self.xml.empty("w:tblLayout", &[("w:type", "fixed")])?;
        let padding = &style.cell_padding;
        self.xml.open("w:tblCellMar", &[])?;
        for (side, points) in [
            ("w:top", padding.top),
            ("w:left", padding.left),
            ("w:bottom", padding.bottom),
            ("w:right", padding.right),
        ] {
            let w = twips(points).to_string();
            self.xml.empty(side, &[("w:w", &w), ("w:type", "dxa")])?;
        }
        self.xml.close("w:tblCellMar")?;
        self.xml.close("w:tblPr")?;

        self.xml.open("w:tblGrid", &[])?;
        for width in &layout.column_widths {
            let w = twips(*width).to_string();
            self.xml.empty("w:gridCol", &[("w:w", &w)])?;
        }
        self.xml.close("w:tblGrid")?;

        let line = style.font_size * style.line_height_factor;
        for row in &table.rows {
            self.xml.open("w:tr", &[])?;
            self.xml.open("w:trPr", &[])?;
            self.xml.empty("w:cantSplit", &[])?;
            if row.is_header {
                self.xml.empty("w:tblHeader", &[])?;
            }
            self.xml.close("w:trPr")?;

            let (background, color) = if row.is_header {
                (style.header_background, Some(style.header_text_color))
            } else {
                (row.background, row.text_color)
            };
            for (c, width) in layout.column_widths.iter().enumerate() {
                let cell = row.cells.get(c);
                let w = twips(*width).to_string();
                self.xml.open("w:tc", &[])?;
                self.xml.open("w:tcPr", &[])?;
                self.xml.empty("w:tcW", &[("w:w", &w), ("w:type", "dxa")])?;
                if let Some(fill) = background {
                    self.shading(fill)?;
                }
                self.xml.close("w:tcPr")?;

                let props = ParagraphProps {
                    line: Some(line),
                    align: Some(ParagraphAlignment::Left),
                    ..ParagraphProps::default()
                };
                let mut run_style = TextStyle::new(style.font_size);
                if row.is_header || cell.is_some_and(|cell| cell.bold) {
                    run_style = run_style.bold();
                }
                if let Some(color) = color {
                    run_style = run_style.color(color);
                }
                let text = cell.map(|cell| cell.content.as_str()).unwrap_or_default();
                self.paragraph(&props, text, Some(run_style))?;
                self.xml.close("w:tc")?;
            }
            self.xml.close("w:tr")?;
        }
        self.xml.close("w:tbl")?;
        self.spacer(BLOCK_GAP)
    }

    fn bullets(&mut self, items: &[Vec<String>]) -> Result<()> {
        for (i, item) in items.iter().enumerate() {
            let mut props = ParagraphProps::styled(style_id::LIST_BULLET);
            if i + 1 == items.len() {
                props = props.after(BLOCK_GAP);
            }
            self.paragraph(&props, &item.join(" "), None)?;
        }
        Ok(())
    }

    fn figures(&mut self, block: &ImageBlock, images: &[PlacedImage], scale: f32) -> Result<()> {
        match block.layout {
            ImageLayout::Single => {
                for image in images {
                    self.figure(image, scale, true)?;
                }
                Ok(())
            },
            ImageLayout::Paired => self.figure_pair(images, scale),
        }
    }

    fn figure(&mut self, image: &PlacedImage, scale: f32, spaced: bool) -> Result<()> {
        let index = *self
            .media
            .photos
            .get(&image.id)
            .ok_or_else(|| Error::Layout(format!("image {} was not registered", image.id)))?;
        let caption = image.caption_lines.join(" ");
        let description = if caption.is_empty() {
            format!("Photo {}", image.id)
        } else {
            caption.clone()
        };

        let mut props = ParagraphProps {
            keep_next: !caption.is_empty(),
            ..ParagraphProps::default().align(ParagraphAlignment::Center)
        };
        if spaced && caption.is_empty() {
            props = props.after(BLOCK_GAP);
        }
        let (width, height) = (image.width * scale, image.height * scale);
        self.picture_paragraph(&props, index, width, height, &description)?;

        if !caption.is_empty() {
            let mut props = ParagraphProps::styled(style_id::CAPTION);
            if spaced {
                props = props.after(BLOCK_GAP);
            }
            self.paragraph(&props, &caption, None)?;
        }
        Ok(())
    }

    /// Two slots and the gutter as a borderless one-row table.
    fn figure_pair(&mut self, images: &[PlacedImage], scale: f32) -> Result<()> {
        let g = self.geometry();
        let slot = (g.content_width() - GUTTER) / 2.0;
        let widths = [slot, GUTTER, slot];

        self.xml.open("w:tbl", &[])?;
        self.xml.open("w:tblPr", &[])?;
        let total = twips(g.content_width()).to_string();
        self.xml.empty("w:tblW", &[("w:w", &total), ("w:type", "dxa")])?;
        self.xml.empty("w:tblLayout", &[("w:type", "fixed")])?;
        self.xml.close("w:tblPr")?;
        self.xml.open("w:tblGrid", &[])?;
        for width in widths {
            let w = twips(width).to_string();
            self.xml.empty("w:gridCol", &[("w:w", &w)])?;
        }
        self.xml.close("w:tblGrid")?;

        self.xml.open("w:tr", &[])?;
        self.xml.open("w:trPr", &[])?;
        self.xml.empty("w:cantSplit", &[])?;
        self.xml.close("w:trPr")?;
        for (column, width) in widths.iter().enumerate() {
            let w = twips(*width).to_string();
            self.xml.open("w:tc", &[])?;
            self.xml.open("w:tcPr", &[])?;
            self.xml.empty("w:tcW", &[("w:w", &w), ("w:type", "dxa")])?;
            self.xml.close("w:tcPr")?;
            let image = match column {
                0 => images.first(),
                2 => images.get(1),
                _ => None,
            };
            match image {
                Some(image) => self.figure(image, scale, false)?,
                None => self.empty_paragraph()?,
            }
            self.xml.close("w:tc")?;
        }
        self.xml.close("w:tr")?;
        self.xml.close("w:tbl")?;
        self.spacer(BLOCK_GAP)
    }

    fn free_text(&mut self, lines: &[TextLine]) -> Result<()> {
        let typo = &self.context.config.typography;
        let half_line = typo.line_height(typo.body_size) * 0.5;

        let mut paragraphs: Vec<(usize, Vec<&str>)> = Vec::new();
        for line in lines {
            match paragraphs.last_mut() {
                Some((index, texts)) if *index == line.paragraph => texts.push(&line.text),
                _ => paragraphs.push((line.paragraph, vec![line.text.as_str()])),
            }
        }

        let count = paragraphs.len();
        for (i, (_, texts)) in paragraphs.into_iter().enumerate() {
            let gap = if i + 1 == count { BLOCK_GAP } else { half_line };
            self.paragraph(&ParagraphProps::default().after(gap), &texts.join(" "), None)?;
        }
        Ok(())
    }

    // -- bands ------------------------------------------------------------

    fn header(&mut self, page: Option<&Page>) -> Result<()> {
        let config = self.context.config;
        let g = self.geometry();
        let rule = Some(("bottom", config.palette.primary, 1.0));
        self.xml.open("w:hdr", &namespaces())?;

        if let Some((index, info)) = self.media.asset(AssetName::Header) {
            let m = Margins::from_geometry(&g);
            let (w, h) = fit_within(
                info.width as f32,
                info.height as f32,
                g.content_width(),
                g.header_reserved - m.header - 24.0,
            );
            let props = ParagraphProps {
                border: rule,
                ..ParagraphProps::styled(style_id::BAND)
            };
            self.picture_paragraph(&props, index, w, h, "Header")?;
        } else {
            let size = config.typography.header_footer_size;
            let (title, detail) = page
                .and_then(|p| p.header.as_ref())
                .map(|h| (h.title.as_str(), h.detail.as_str()))
                .unwrap_or((config.branding.company_name.as_str(), ""));
            let title_style = TextStyle::new(size + 4.0).bold().color(config.palette.primary);
            self.paragraph(&ParagraphProps::styled(style_id::BAND), title, Some(title_style))?;
            let props = ParagraphProps {
                border: rule,
                ..ParagraphProps::styled(style_id::BAND)
            };
            self.paragraph(&props, detail, None)?;
        }

        self.xml.close("w:hdr")
    }

    fn field(&mut self, instruction: &str, placeholder: &str) -> Result<()> {
        self.xml.open("w:fldSimple", &[("w:instr", instruction)])?;
        self.run(placeholder, None)?;
        self.xml.close("w:fldSimple")
    }

    fn footer(&mut self, page: Option<&Page>, total: usize) -> Result<()> {
        let config = self.context.config;
        let g = self.geometry();
        let props = ParagraphProps {
            border: Some(("top", config.palette.border, 0.5)),
            ..ParagraphProps::styled(style_id::BAND)
        };
        self.xml.open("w:ftr", &namespaces())?;
        self.xml.open("w:p", &[])?;
        self.paragraph_properties(&props)?;

        if let Some((index, info)) = self.media.asset(AssetName::Footer) {
            let (w, h) = fit_within(
                info.width as f32,
                info.height as f32,
                g.content_width() / 2.0,
                g.footer_reserved - 32.0,
            );
            self.drawing(index, w, h, "Footer")?;
        } else if let Some(footer) = page.and_then(|p| p.footer.as_ref()) {
            self.run(&footer.text, None)?;
        }

        self.xml.open("w:r", &[])?;
        self.xml.empty("w:tab", &[])?;
        self.xml.close("w:r")?;
        self.run("Page ", None)?;
        let first = page.map(|p| p.number).unwrap_or(1).to_string();
        self.field(" PAGE ", &first)?;
        self.run(" / ", None)?;
        self.field(" NUMPAGES ", &total.to_string())?;

        self.xml.close("w:p")?;
        self.xml.close("w:ftr")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::Composer;
    use crate::config::ComposeConfig;
    use crate::model::{ImageRecord, ReportRecord};
    use std::collections::BTreeSet;
    use std::io::{Cursor, Read};

    fn record() -> ReportRecord {
        ReportRecord::from_json(
            r#"{"client": {"nom": "Durand", "prenom": "Alice"},
                "inspection": {"date": "2024-05-14"},
                "equipements": {"skimmer": {"quantite": 2}},
                "conformite": [{"element": "Local", "statut": "Non conforme"}]}"#,
        )
        .unwrap()
    }

    fn render(config: ComposeConfig, images: &[ImageRecord]) -> Vec<u8> {
        let composer = Composer::new(config);
        let output = composer
            .compose(&record(), images, &BTreeSet::from([Target::Office]))
            .unwrap();
        output.output(Target::Office).unwrap().to_vec()
    }

    fn entry(docx: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_package_entries() {
        let docx = render(ComposeConfig::new(), &[]);
        let archive = zip::ZipArchive::new(Cursor::new(docx.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for expected in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/numbering.xml",
            "word/header1.xml",
            "word/footer1.xml",
            "word/_rels/document.xml.rels",
            "docProps/core.xml",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_document_structure() {
        let docx = render(ComposeConfig::new(), &[]);
        let document = entry(&docx, "word/document.xml");
        let identification = document.find("w:name=\"section-identification\"").unwrap();
        let conformity = document.find("w:name=\"section-conformity\"").unwrap();
        assert!(identification < conformity);
        assert!(document.contains("<w:br w:type=\"page\"/>"));
        assert!(document.contains("<w:t xml:space=\"preserve\">Skimmer</w:t>"));
        // non-conforming row shading
        let fill = format!("w:fill=\"{}\"", ComposeConfig::new().palette.alert_background.hex());
        assert!(document.contains(&fill));

        let footer = entry(&docx, "word/footer1.xml");
        assert!(footer.contains("w:instr=\" PAGE \""));
        assert!(footer.contains("w:instr=\" NUMPAGES \""));
    }

    #[test]
    fn test_pinned_timestamp_is_reproducible() {
        let config = ComposeConfig::new().with_office_timestamp("2024-05-14T09:00:00Z");
        let first = render(config.clone(), &[]);
        let second = render(config, &[]);
        assert_eq!(first, second);
        assert!(entry(&first, "docProps/core.xml").contains("2024-05-14T09:00:00Z"));
    }

    #[test]
    fn test_photo_is_packaged() {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([30, 90, 200]));
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageOutputFormat::Png).unwrap();
        let photo = ImageRecord::new(png.into_inner(), "image/png")
            .with_description("Vue d'ensemble du bassin");

        let docx = render(ComposeConfig::new(), &[photo]);
        let rels = entry(&docx, "word/_rels/document.xml.rels");
        assert!(rels.contains("Target=\"media/image1.png\""));
        let document = entry(&docx, "word/document.xml");
        assert!(document.contains("r:embed=\"rIdImg1\""));
        assert!(entry(&docx, "[Content_Types].xml").contains("Extension=\"png\""));
    }
}
