//! PDF renderer.
//!
//! Draws a [`PagePlan`] with the Base-14 Helvetica faces. Plan offsets are
//! measured from the top of the page; PDF space grows upwards, so every
//! placement is anchored at `page height - top`.
//!
//! Each section title opens a `/Sect` marked-content sequence carrying the
//! section key and adds an outline entry, which gives viewers a navigable
//! table of contents and keeps the section order machine-checkable.

use super::{accent_color, baseline_offset, placed_images, RenderContext, Renderer};
use crate::assets::AssetName;
use crate::compose::Target;
use crate::config::Rgb;
use crate::error::{Error, Result};
use crate::geometry::{fit_within, PageGeometry};
use crate::layout::{
    build_table, page_label, Page, PageKind, PagePlan, PlacedContent, PlacedImage, Placement,
    BULLET_GAP, BULLET_INDENT, CAPTION_GAP, HEADING_PADDING, TITLE_INSET,
};
use crate::model::{ImageId, ImageInfo};
use crate::sections::Block;
use crate::writer::{
    Base14Font, Base14Metrics, FontMetrics, ImageData, PageBuilder, PdfWriter, PdfWriterConfig,
};
use std::collections::BTreeMap;

const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);

/// Height of the cover band when no cover artwork is available.
const COVER_BAND: f32 = 260.0;

/// Vertical inset of header and footer artwork inside their band.
const BAND_INSET: f32 = 12.0;

/// Renders the Canvas (PDF) target.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanvasRenderer;

impl CanvasRenderer {
    /// Create a renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for CanvasRenderer {
    fn target(&self) -> Target {
        Target::Canvas
    }

    fn metrics(&self) -> Box<dyn FontMetrics> {
        Box::new(Base14Metrics::helvetica())
    }

    fn render(&self, context: &RenderContext<'_>, plan: &PagePlan) -> Result<Vec<u8>> {
        let config = context.config;
        let writer_config = PdfWriterConfig::default()
            .with_title(context.document_title())
            .with_author(config.branding.company_name.clone())
            .with_subject(config.branding.report_title.clone())
            .with_compress(config.pdf.compress);
        let mut writer = PdfWriter::with_config(writer_config);

        // XObjects are registered before the first page borrows the writer
        let mut images = BTreeMap::new();
        for placed in plan.placements().flat_map(placed_images) {
            if images.contains_key(&placed.id) {
                continue;
            }
            let data = ImageData::from_bytes(context.image_data(placed.id.index())?)?;
            images.insert(placed.id, writer.register_image(data));
        }

        let mut assets = BTreeMap::new();
        for name in context.assets.names() {
            let Some(asset) = context.assets.get(name) else {
                continue;
            };
            match ImageData::from_bytes(&asset.data) {
                Ok(data) => {
                    assets.insert(name, (writer.register_image(data), asset.info));
                },
                Err(e) => log::warn!("Asset {} cannot be embedded ({}), using text", name, e),
            }
        }

        let painter = Painter {
            context,
            geometry: config.geometry,
            metrics: Base14Metrics::helvetica(),
            images,
            assets,
        };

        let total = plan.total_pages();
        for page in &plan.pages {
            let mut builder = writer.add_page(painter.geometry.width, painter.geometry.height);
            match page.kind {
                PageKind::Cover => painter.cover(&mut builder, plan),
                PageKind::Closing => painter.closing(&mut builder, plan),
                PageKind::Body => painter.body(&mut builder, page, total)?,
            }
        }

        log::debug!("PDF: {} pages, {} images", writer.page_count(), painter.images.len());
        writer.finish()
    }
}

struct Painter<'c, 'a> {
    context: &'c RenderContext<'a>,
    geometry: PageGeometry,
    metrics: Base14Metrics,
    images: BTreeMap<ImageId, String>,
    assets: BTreeMap<AssetName, (String, ImageInfo)>,
}

impl Painter<'_, '_> {
    fn text(
        &self,
        page: &mut PageBuilder<'_>,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Rgb,
    ) {
        page.content()
            .fill_color(color)
            .text(Base14Font::select(bold).resource_name(), size, x, y, text);
    }

    fn width(&self, text: &str, size: f32, bold: bool) -> f32 {
        if bold {
            self.metrics.bold_text_width(text, size)
        } else {
            self.metrics.text_width(text, size)
        }
    }

    fn full_page_asset(&self, page: &mut PageBuilder<'_>, name: AssetName) -> bool {
        match self.assets.get(&name) {
            Some((resource, _)) => {
                page.draw_image(resource, 0.0, 0.0, self.geometry.width, self.geometry.height);
                true
            },
            None => false,
        }
    }

    fn cover(&self, page: &mut PageBuilder<'_>, plan: &PagePlan) {
        if self.full_page_asset(page, AssetName::Cover) {
            return;
        }
        let Some(cover) = &plan.cover else {
            return;
        };
        let config = self.context.config;
        let typo = &config.typography;
        let g = &self.geometry;

        page.content()
            .fill_color(config.palette.primary)
            .rect(0.0, g.height - COVER_BAND, g.width, COVER_BAND)
            .fill();
        let mut y = g.height - COVER_BAND / 2.0;
        self.text(page, &cover.title, g.margin, y, typo.cover_title_size, true, WHITE);

        y -= typo.line_height(typo.cover_title_size);
        for line in &cover.lines {
            self.text(page, line, g.margin, y, typo.subtitle_size, false, WHITE);
            y -= typo.line_height(typo.subtitle_size);
        }
    }

    fn closing(&self, page: &mut PageBuilder<'_>, plan: &PagePlan) {
        if self.full_page_asset(page, AssetName::Closing) {
            return;
        }
        let Some(closing) = &plan.closing else {
            return;
        };
        let config = self.context.config;
        let typo = &config.typography;
        let lh = typo.line_height(typo.subtitle_size);
        let mut y = self.geometry.height / 2.0 + closing.lines.len() as f32 * lh / 2.0;

        for (i, line) in closing.lines.iter().enumerate() {
            let (bold, color) = if i == 0 {
                (true, config.palette.primary)
            } else {
                (false, config.palette.text)
            };
            let x = (self.geometry.width - self.width(line, typo.subtitle_size, bold)) / 2.0;
            self.text(page, line, x, y, typo.subtitle_size, bold, color);
            y -= lh;
        }
    }

    fn body(&self, page: &mut PageBuilder<'_>, plan_page: &Page, total: usize) -> Result<()> {
        self.header(page, plan_page);
        for placement in &plan_page.placements {
            self.placement(page, placement)?;
        }
        self.footer(page, plan_page, total);
        Ok(())
    }

    fn header(&self, page: &mut PageBuilder<'_>, plan_page: &Page) {
        let config = self.context.config;
        let g = &self.geometry;
        let rule_y = g.height - (g.header_reserved - 16.0);

        if let Some((resource, info)) = self.assets.get(&AssetName::Header) {
            let (w, h) = fit_within(
                info.width as f32,
                info.height as f32,
                g.content_width(),
                g.header_reserved - 2.0 * BAND_INSET - 16.0,
            );
            page.draw_image(resource, g.margin, g.height - BAND_INSET - h, w, h);
        } else if let Some(header) = &plan_page.header {
            let size = config.typography.header_footer_size;
            let palette = &config.palette;
            let (x, top) = (g.margin, g.height);
            self.text(page, &header.title, x, top - 40.0, size + 4.0, true, palette.primary);
            self.text(page, &header.detail, x, top - 56.0, size, false, palette.muted);
        }

        page.content()
            .stroke_color(config.palette.primary)
            .set_line_width(1.0)
            .move_to(g.margin, rule_y)
            .line_to(g.width - g.margin, rule_y)
            .stroke();
    }

    fn footer(&self, page: &mut PageBuilder<'_>, plan_page: &Page, total: usize) {
        let config = self.context.config;
        let palette = &config.palette;
        let size = config.typography.header_footer_size;
        let g = &self.geometry;
        let rule_y = g.footer_reserved - 16.0;
        let baseline = rule_y - 16.0;

        page.content()
            .stroke_color(palette.border)
            .set_line_width(0.5)
            .move_to(g.margin, rule_y)
            .line_to(g.width - g.margin, rule_y)
            .stroke();

        let label = plan_page
            .footer
            .as_ref()
            .map(|f| f.page_label.clone())
            .unwrap_or_else(|| page_label(plan_page.number, total));
        let label_width = self.width(&label, size, false);

        if let Some((resource, info)) = self.assets.get(&AssetName::Footer) {
            let (w, h) = fit_within(
                info.width as f32,
                info.height as f32,
                g.content_width() - label_width - 16.0,
                rule_y - BAND_INSET,
            );
            page.draw_image(resource, g.margin, rule_y - 4.0 - h, w, h);
        } else if let Some(footer) = &plan_page.footer {
            self.text(page, &footer.text, g.margin, baseline, size, false, palette.muted);
        }
        let label_x = g.width - g.margin - label_width;
        self.text(page, &label, label_x, baseline, size, false, palette.muted);
    }

    fn placement(&self, page: &mut PageBuilder<'_>, placement: &Placement) -> Result<()> {
        let block = self.context.block(placement.block)?;
        let top = self.geometry.height - placement.top;
        let margin = self.geometry.margin;

        if placement.is_scaled() {
            let s = placement.scale;
            page.content()
                .save_state()
                .transform(s, 0.0, 0.0, s, margin * (1.0 - s), top * (1.0 - s));
        }

        match (block, &placement.content) {
            (Block::SectionTitle { section, text, accent }, PlacedContent::Heading { lines }) => {
                page.content().begin_marked("Sect", section.key());
                self.title(page, lines, top, accent_color(*accent, &self.context.config.palette));
                page.content().end_marked();
                page.add_outline(text.clone(), top);
            },
            (Block::Subtitle { accent, .. }, PlacedContent::Heading { lines }) => {
                let typo = &self.context.config.typography;
                let size = typo.subtitle_size;
                let color = accent_color(*accent, &self.context.config.palette);
                for (i, line) in lines.iter().enumerate() {
                    let y = top - baseline_offset(0.0, i, size, typo.line_height(size));
                    self.text(page, line, margin, y, size, true, color);
                }
            },
            (Block::Table(table), PlacedContent::Table { layout }) => {
                let config = self.context.config;
                build_table(table, &config.typography, &config.palette).render(
                    page.content(),
                    margin,
                    top,
                    layout,
                    &self.metrics,
                );
            },
            (Block::BulletList(_), PlacedContent::Bullets { items }) => {
                self.bullets(page, items, top);
            },
            (Block::Image(_), PlacedContent::Images(images)) => {
                for image in images {
                    self.figure(page, image, top)?;
                }
            },
            (Block::FreeText(_), PlacedContent::TextLines(lines)) => {
                let config = self.context.config;
                let size = config.typography.body_size;
                let lh = config.typography.line_height(size);
                let mut offset = 0.0;
                let mut paragraph = None;
                for line in lines {
                    if paragraph.is_some_and(|p| p != line.paragraph) {
                        offset += lh * 0.5;
                    }
                    paragraph = Some(line.paragraph);
                    let y = top - baseline_offset(offset, 0, size, lh);
                    self.text(page, &line.text, margin, y, size, false, config.palette.text);
                    offset += lh;
                }
            },
            (block, _) => {
                return Err(Error::Layout(format!(
                    "placed content does not match {} block #{}",
                    block.kind_name(),
                    placement.block
                )))
            },
        }

        if placement.is_scaled() {
            page.content().restore_state();
        }
        Ok(())
    }

    fn title(&self, page: &mut PageBuilder<'_>, lines: &[String], top: f32, color: Rgb) {
        let config = self.context.config;
        let size = config.typography.title_size;
        let lh = config.typography.line_height(size);
        let height = lines.len() as f32 * lh + 2.0 * HEADING_PADDING;
        let g = &self.geometry;

        let radius = config.palette.corner_radius;
        page.content()
            .fill_color(color)
            .rounded_rect(g.margin, top - height, g.content_width(), height, radius)
            .fill();
        for (i, line) in lines.iter().enumerate() {
            let y = top - baseline_offset(HEADING_PADDING, i, size, lh);
            self.text(page, line, g.margin + TITLE_INSET, y, size, true, WHITE);
        }
    }

    fn bullets(&self, page: &mut PageBuilder<'_>, items: &[Vec<String>], top: f32) {
        let config = self.context.config;
        let size = config.typography.body_size;
        let lh = config.typography.line_height(size);
        let x = self.geometry.margin;
        let mut offset = 0.0;

        for item in items {
            for (i, line) in item.iter().enumerate() {
                let y = top - baseline_offset(offset, 0, size, lh);
                if i == 0 {
                    self.text(page, "\u{2022}", x + 3.0, y, size, true, config.palette.secondary);
                }
                self.text(page, line, x + BULLET_INDENT, y, size, false, config.palette.text);
                offset += lh;
            }
            offset += BULLET_GAP;
        }
    }

    fn figure(&self, page: &mut PageBuilder<'_>, image: &PlacedImage, top: f32) -> Result<()> {
        let config = self.context.config;
        let resource = self
            .images
            .get(&image.id)
            .ok_or_else(|| Error::Layout(format!("image {} was not registered", image.id)))?;
        let x = self.geometry.margin + image.x_offset;
        let y = top - image.height;

        page.draw_image(resource, x, y, image.width, image.height);
        page.content()
            .stroke_color(config.palette.border)
            .set_line_width(0.5)
            .rounded_rect(x, y, image.width, image.height, config.palette.corner_radius)
            .stroke();

        let size = config.typography.caption_size;
        let lh = config.typography.line_height(size);
        for (i, line) in image.caption_lines.iter().enumerate() {
            let width = self.width(line, size, false);
            let cx = self.geometry.margin + image.slot_offset + (image.slot_width - width) / 2.0;
            let cy = top - baseline_offset(image.height + CAPTION_GAP, i, size, lh);
            self.text(page, line, cx, cy, size, false, config.palette.muted);
        }
        Ok(())
    }
}
