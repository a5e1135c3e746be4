//! HTML renderer.
//!
//! Produces a single self-contained document: styles are inlined, photos and
//! assets are embedded as base64 `data:` URIs. Every page of the plan becomes
//! a fixed-size `<section class="page">` whose blocks are absolutely
//! positioned at the plan's offsets, so the browser never reflows content
//! across pages and `@page` printing reproduces the PDF pagination.

use super::{accent_color, placed_images, portable_image, RenderContext, Renderer};
use crate::assets::AssetName;
use crate::compose::Target;
use crate::config::ComposeConfig;
use crate::error::{Error, Result};
use crate::geometry::fit_within;
use crate::layout::{
    build_table, Page, PageKind, PagePlan, PlacedContent, PlacedImage, Placement, TextLine,
    BULLET_GAP, BULLET_INDENT, CAPTION_GAP, HEADING_PADDING, TITLE_INSET,
};
use crate::model::ImageId;
use crate::sections::{Block, TableBlock};
use crate::writer::{Base14Metrics, FontMetrics, TableLayout};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    /// Regex for matching URLs in text
    static ref RE_URL: Regex = Regex::new(r"https?://[^\s<>()]+").unwrap();

    /// Regex for matching email addresses
    static ref RE_EMAIL: Regex = Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap();
}

/// Browser fonts are wider than Helvetica on some systems.
const METRICS_SCALE: f32 = 1.05;

/// Renders the Markup (HTML) target.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Create a renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for HtmlRenderer {
    fn target(&self) -> Target {
        Target::Markup
    }

    fn metrics(&self) -> Box<dyn FontMetrics> {
        Box::new(Base14Metrics::scaled(METRICS_SCALE))
    }

    fn render(&self, context: &RenderContext<'_>, plan: &PagePlan) -> Result<Vec<u8>> {
        let mut images = BTreeMap::new();
        for placed in plan.placements().flat_map(placed_images) {
            if !images.contains_key(&placed.id) {
                images.insert(placed.id, data_uri(context.image_data(placed.id.index())?)?);
            }
        }

        let mut assets = BTreeMap::new();
        for name in context.assets.names() {
            let Some(asset) = context.assets.get(name) else {
                continue;
            };
            match data_uri(&asset.data) {
                Ok(uri) => {
                    assets.insert(name, uri);
                },
                Err(e) => log::warn!("Asset {} cannot be embedded ({}), using text", name, e),
            }
        }

        let writer = MarkupWriter {
            context,
            metrics: Base14Metrics::scaled(METRICS_SCALE),
            images,
            assets,
        };

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&context.document_title())));
        html.push_str(&stylesheet(context.config));
        html.push_str("</head>\n<body>\n");
        for page in &plan.pages {
            writer.page(&mut html, page, plan)?;
        }
        html.push_str("</body>\n</html>\n");

        log::debug!("HTML: {} pages, {} bytes", plan.total_pages(), html.len());
        Ok(html.into_bytes())
    }
}

fn data_uri(data: &[u8]) -> Result<String> {
    let (kind, bytes) = portable_image(data)?;
    Ok(format!("data:{};base64,{}", kind.media_type(), STANDARD.encode(bytes)))
}

fn pt(value: f32) -> String {
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{}pt", trimmed)
}

fn stylesheet(config: &ComposeConfig) -> String {
    let g = &config.geometry;
    let p = &config.palette;
    let t = &config.typography;

    let mut css = String::new();
    css.push_str("<style>\n");
    css.push_str(&format!("@page {{ size: {} {}; margin: 0; }}\n", pt(g.width), pt(g.height)));
    css.push_str("* { box-sizing: border-box; }\n");
    css.push_str(&format!(
        "body {{ margin: 0; background: #e5e7eb; color: {}; font-family: Helvetica, Arial, sans-serif; }}\n",
        p.text.css()
    ));
    css.push_str(&format!(
        ".page {{ position: relative; width: {}; height: {}; margin: 0 auto 12pt; background: #fff; overflow: hidden; page-break-after: always; break-after: page; }}\n",
        pt(g.width),
        pt(g.height)
    ));
    css.push_str(".page:last-child { page-break-after: auto; break-after: auto; }\n");
    css.push_str(".block { position: absolute; }\n");
    css.push_str(&format!(
        ".line {{ display: block; white-space: nowrap; height: {lh}; line-height: {lh}; }}\n",
        lh = pt(t.line_height(t.body_size))
    ));
    css.push_str(&format!(
        ".title {{ margin: 0; padding: {} {}; border-radius: {}; color: #fff; font-size: {}; font-weight: bold; }}\n",
        pt(HEADING_PADDING),
        pt(TITLE_INSET),
        pt(p.corner_radius),
        pt(t.title_size)
    ));
    css.push_str(&format!(
        ".title .line {{ height: {lh}; line-height: {lh}; }}\n",
        lh = pt(t.line_height(t.title_size))
    ));
    css.push_str(&format!(
        ".subtitle {{ margin: 0; font-size: {}; font-weight: bold; }}\n",
        pt(t.subtitle_size)
    ));
    css.push_str(&format!(
        ".subtitle .line {{ height: {lh}; line-height: {lh}; }}\n",
        lh = pt(t.line_height(t.subtitle_size))
    ));
    css.push_str(&format!(".text, .bullets {{ font-size: {}; }}\n", pt(t.body_size)));
    css.push_str(&format!(
        ".bullets {{ margin: 0; padding: 0 0 0 {}; }}\n",
        pt(BULLET_INDENT)
    ));
    css.push_str(&format!(
        ".bullets li {{ margin-bottom: {}; }}\n.bullets li::marker {{ color: {}; }}\n",
        pt(BULLET_GAP),
        p.secondary.css()
    ));
    css.push_str(&format!(
        "table {{ border-collapse: collapse; table-layout: fixed; font-size: {}; line-height: {}; }}\n",
        pt(t.table_size),
        pt(t.line_height(t.table_size))
    ));
    css.push_str(&format!(
        "td, th {{ border: 0.5pt solid {}; padding: 0 5pt; white-space: nowrap; vertical-align: middle; text-align: left; font-weight: normal; }}\n",
        p.border.css()
    ));
    css.push_str(&format!(
        "thead th {{ background: {}; color: {}; font-weight: bold; }}\n",
        p.table_header_background.css(),
        p.table_header_text.css()
    ));
    css.push_str("td.key { font-weight: bold; }\n");
    css.push_str(&format!(
        "tr[data-flag=\"non-conforming\"] td {{ background: {}; color: {}; }}\n",
        p.alert_background.css(),
        p.alert.css()
    ));
    css.push_str(&format!(
        "tr[data-flag=\"watch\"] td {{ background: {}; color: {}; }}\n",
        p.watch_background.css(),
        p.watch.css()
    ));
    css.push_str(&format!(
        "figure {{ position: absolute; top: 0; margin: 0; }}\nfigure img {{ display: block; border: 0.5pt solid {}; border-radius: {}; }}\n",
        p.border.css(),
        pt(p.corner_radius)
    ));
    css.push_str(&format!(
        "figcaption {{ margin-top: {}; color: {}; font-size: {}; text-align: center; }}\nfigcaption .line {{ height: {lh}; line-height: {lh}; }}\n",
        pt(CAPTION_GAP),
        p.muted.css(),
        pt(t.caption_size),
        lh = pt(t.line_height(t.caption_size))
    ));
    css.push_str(&format!(
        ".band {{ position: absolute; left: {m}; right: {m}; font-size: {}; color: {}; }}\n",
        pt(t.header_footer_size),
        p.muted.css(),
        m = pt(g.margin)
    ));
    css.push_str(&format!(
        "header.band {{ top: 0; height: {}; border-bottom: 1pt solid {}; }}\n",
        pt(g.header_reserved - 16.0),
        p.primary.css()
    ));
    css.push_str(&format!(
        "header .company {{ position: absolute; top: 28pt; font-size: {}; font-weight: bold; color: {}; }}\nheader .detail {{ position: absolute; top: 46pt; }}\n",
        pt(t.header_footer_size + 4.0),
        p.primary.css()
    ));
    css.push_str(&format!(
        "footer.band {{ bottom: 0; height: {}; border-top: 0.5pt solid {}; }}\nfooter .company {{ position: absolute; top: 8pt; left: 0; }}\nfooter .page-label {{ position: absolute; top: 8pt; right: 0; }}\n",
        pt(g.footer_reserved - 16.0),
        p.border.css()
    ));
    css.push_str(".band img { position: absolute; top: 12pt; left: 0; }\n");
    css.push_str(".full { position: absolute; top: 0; left: 0; width: 100%; height: 100%; }\n");
    css.push_str(&format!(
        ".cover-band {{ position: absolute; top: 0; left: 0; right: 0; height: 260pt; padding: 100pt {} 0; background: {}; color: #fff; }}\n.cover-band h1 {{ margin: 0 0 8pt; font-size: {}; }}\n.cover-band p {{ margin: 0; font-size: {}; line-height: {}; }}\n",
        pt(g.margin),
        p.primary.css(),
        pt(t.cover_title_size),
        pt(t.subtitle_size),
        pt(t.line_height(t.subtitle_size))
    ));
    css.push_str(&format!(
        ".closing {{ position: absolute; top: 45%; left: 0; right: 0; text-align: center; font-size: {}; }}\n.closing p {{ margin: 0; line-height: {}; }}\n.closing p:first-child {{ font-weight: bold; color: {}; }}\n",
        pt(t.subtitle_size),
        pt(t.line_height(t.subtitle_size)),
        p.primary.css()
    ));
    css.push_str("</style>\n");
    css
}

struct MarkupWriter<'c, 'a> {
    context: &'c RenderContext<'a>,
    metrics: Base14Metrics,
    images: BTreeMap<ImageId, String>,
    assets: BTreeMap<AssetName, String>,
}

impl MarkupWriter<'_, '_> {
    fn page(&self, html: &mut String, page: &Page, plan: &PagePlan) -> Result<()> {
        let class = match page.kind {
            PageKind::Cover => "page cover",
            PageKind::Body => "page",
            PageKind::Closing => "page closing-page",
        };
        html.push_str(&format!(
            "<section class=\"{}\" data-page=\"{}\">\n",
            class, page.number
        ));
        match page.kind {
            PageKind::Cover => self.cover(html, plan),
            PageKind::Closing => self.closing(html, plan),
            PageKind::Body => {
                self.header(html, page);
                for placement in &page.placements {
                    self.placement(html, placement)?;
                }
                self.footer(html, page);
            },
        }
        html.push_str("</section>\n");
        Ok(())
    }

    fn full_page_asset(&self, html: &mut String, name: AssetName) -> bool {
        match self.assets.get(&name) {
            Some(uri) => {
                html.push_str(&format!("<img class=\"full\" src=\"{}\" alt=\"\">\n", uri));
                true
            },
            None => false,
        }
    }

    fn cover(&self, html: &mut String, plan: &PagePlan) {
        if self.full_page_asset(html, AssetName::Cover) {
            return;
        }
        let Some(cover) = &plan.cover else {
            return;
        };
        html.push_str("<div class=\"cover-band\">\n");
        html.push_str(&format!("<h1>{}</h1>\n", escape_html(&cover.title)));
        for line in &cover.lines {
            html.push_str(&format!("<p>{}</p>\n", escape_html(line)));
        }
        html.push_str("</div>\n");
    }

    fn closing(&self, html: &mut String, plan: &PagePlan) {
        if self.full_page_asset(html, AssetName::Closing) {
            return;
        }
        let Some(closing) = &plan.closing else {
            return;
        };
        html.push_str("<div class=\"closing\">\n");
        for line in &closing.lines {
            html.push_str(&format!("<p>{}</p>\n", linkify_urls_and_emails(line)));
        }
        html.push_str("</div>\n");
    }

    fn band_asset(
        &self,
        html: &mut String,
        name: AssetName,
        max_width: f32,
        max_height: f32,
    ) -> bool {
        let (Some(uri), Some(asset)) = (self.assets.get(&name), self.context.assets.get(name))
        else {
            return false;
        };
        let (w, h) = fit_within(
            asset.info.width as f32,
            asset.info.height as f32,
            max_width,
            max_height,
        );
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"\" style=\"width:{};height:{}\">\n",
            uri,
            pt(w),
            pt(h)
        ));
        true
    }

    fn header(&self, html: &mut String, page: &Page) {
        let g = &self.context.config.geometry;
        html.push_str("<header class=\"band\">\n");
        let drawn = self.band_asset(
            html,
            AssetName::Header,
            g.content_width(),
            g.header_reserved - 40.0,
        );
        if let (false, Some(header)) = (drawn, &page.header) {
            html.push_str(&format!(
                "<div class=\"company\">{}</div>\n<div class=\"detail\">{}</div>\n",
                escape_html(&header.title),
                escape_html(&header.detail)
            ));
        }
        html.push_str("</header>\n");
    }

    fn footer(&self, html: &mut String, page: &Page) {
        let g = &self.context.config.geometry;
        html.push_str("<footer class=\"band\">\n");
        let drawn = self.band_asset(
            html,
            AssetName::Footer,
            g.content_width() * 0.7,
            g.footer_reserved - 40.0,
        );
        if let Some(footer) = &page.footer {
            if !drawn {
                html.push_str(&format!(
                    "<span class=\"company\">{}</span>\n",
                    escape_html(&footer.text)
                ));
            }
            html.push_str(&format!(
                "<span class=\"page-label\">{}</span>\n",
                escape_html(&footer.page_label)
            ));
        }
        html.push_str("</footer>\n");
    }

    fn placement(&self, html: &mut String, placement: &Placement) -> Result<()> {
        let block = self.context.block(placement.block)?;
        let g = &self.context.config.geometry;
        let mut style = format!(
            "top:{};left:{};width:{}",
            pt(placement.top),
            pt(g.margin),
            pt(g.content_width())
        );
        if placement.is_scaled() {
            style.push_str(&format!(
                ";transform:scale({:.4});transform-origin:top left",
                placement.scale
            ));
        }
        html.push_str(&format!(
            "<div class=\"block\" data-block=\"{}\" style=\"{}\">\n",
            placement.block, style
        ));

        let palette = &self.context.config.palette;
        match (block, &placement.content) {
            (Block::SectionTitle { section, accent, .. }, PlacedContent::Heading { lines }) => {
                html.push_str(&format!(
                    "<h2 class=\"title\" id=\"section-{key}\" data-section=\"{key}\" style=\"background:{}\">{}</h2>\n",
                    accent_color(*accent, palette).css(),
                    lines_html(lines),
                    key = section.key()
                ));
            },
            (Block::Subtitle { accent, .. }, PlacedContent::Heading { lines }) => {
                html.push_str(&format!(
                    "<h3 class=\"subtitle\" style=\"color:{}\">{}</h3>\n",
                    accent_color(*accent, palette).css(),
                    lines_html(lines)
                ));
            },
            (Block::Table(table), PlacedContent::Table { layout }) => {
                self.table(html, table, layout);
            },
            (Block::BulletList(_), PlacedContent::Bullets { items }) => {
                html.push_str("<ul class=\"bullets\">\n");
                for item in items {
                    html.push_str(&format!("<li>{}</li>\n", lines_html(item)));
                }
                html.push_str("</ul>\n");
            },
            (Block::Image(_), PlacedContent::Images(images)) => {
                for image in images {
                    self.figure(html, image)?;
                }
            },
            (Block::FreeText(_), PlacedContent::TextLines(lines)) => {
                self.text(html, lines);
            },
            (block, _) => {
                return Err(Error::Layout(format!(
                    "placed content does not match {} block #{}",
                    block.kind_name(),
                    placement.block
                )))
            },
        }

        html.push_str("</div>\n");
        Ok(())
    }

    fn table(&self, html: &mut String, block: &TableBlock, layout: &TableLayout) {
        let config = self.context.config;
        let table = build_table(block, &config.typography, &config.palette);
        let header_rows = table.rows.len() - block.rows.len();

        html.push_str(&format!(
            "<table style=\"width:{}\">\n<colgroup>",
            pt(layout.total_width)
        ));
        for width in &layout.column_widths {
            html.push_str(&format!("<col style=\"width:{}\">", pt(*width)));
        }
        html.push_str("</colgroup>\n");

        for (index, row) in table.rows.iter().enumerate() {
            let height = layout.row_heights.get(index).copied().unwrap_or_default();
            if row.is_header {
                html.push_str("<thead>\n");
            } else if index == header_rows {
                html.push_str("<tbody>\n");
            }

            let flag = index
                .checked_sub(header_rows)
                .and_then(|i| block.rows.get(i))
                .and_then(|r| r.flag.name());
            match flag {
                Some(name) => html.push_str(&format!(
                    "<tr data-flag=\"{}\" style=\"height:{}\">",
                    name,
                    pt(height)
                )),
                None => html.push_str(&format!("<tr style=\"height:{}\">", pt(height))),
            }

            for (col, cell) in row.cells.iter().enumerate() {
                let width = layout.column_widths.get(col).copied().unwrap_or_default();
                let lines = table.cell_lines(row, cell, width, &self.metrics);
                let content = lines
                    .iter()
                    .map(|l| escape_html(l))
                    .collect::<Vec<_>>()
                    .join("<br>");
                if row.is_header {
                    html.push_str(&format!("<th>{}</th>", content));
                } else if cell.bold {
                    html.push_str(&format!("<td class=\"key\">{}</td>", content));
                } else {
                    html.push_str(&format!("<td>{}</td>", content));
                }
            }
            html.push_str("</tr>\n");

            if row.is_header {
                html.push_str("</thead>\n");
            }
        }
        if table.rows.len() > header_rows {
            html.push_str("</tbody>\n");
        }
        html.push_str("</table>\n");
    }

    fn figure(&self, html: &mut String, image: &PlacedImage) -> Result<()> {
        let uri = self
            .images
            .get(&image.id)
            .ok_or_else(|| Error::Layout(format!("image {} was not embedded", image.id)))?;
        let alt = image.caption_lines.join(" ");

        html.push_str(&format!(
            "<figure style=\"left:{};width:{}\">\n",
            pt(image.slot_offset),
            pt(image.slot_width)
        ));
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\" style=\"margin-left:{};width:{};height:{}\">\n",
            uri,
            escape_html(&alt),
            pt(image.x_offset - image.slot_offset),
            pt(image.width),
            pt(image.height)
        ));
        if !image.caption_lines.is_empty() {
            html.push_str(&format!(
                "<figcaption>{}</figcaption>\n",
                lines_html(&image.caption_lines)
            ));
        }
        html.push_str("</figure>\n");
        Ok(())
    }

    fn text(&self, html: &mut String, lines: &[TextLine]) {
        let typo = &self.context.config.typography;
        let gap = typo.line_height(typo.body_size) * 0.5;
        html.push_str("<div class=\"text\">\n");
        let mut paragraph = None;
        for line in lines {
            let text = linkify_urls_and_emails(&line.text);
            if paragraph.is_some_and(|p| p != line.paragraph) {
                html.push_str(&format!(
                    "<span class=\"line\" style=\"margin-top:{}\">{}</span>\n",
                    pt(gap),
                    text
                ));
            } else {
                html.push_str(&format!("<span class=\"line\">{}</span>\n", text));
            }
            paragraph = Some(line.paragraph);
        }
        html.push_str("</div>\n");
    }
}

fn lines_html(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("<span class=\"line\">{}</span>", escape_html(l)))
        .collect()
}

/// Escape HTML special characters.
///
/// # Examples
///
/// ```
/// use report_oxide::converters::html::escape_html;
///
/// assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
/// ```
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Escape text and turn URLs and email addresses into links.
///
/// Addresses inside a URL stay part of that URL's link.
pub fn linkify_urls_and_emails(text: &str) -> String {
    let escaped = escape_html(text);
    let mut html = String::with_capacity(escaped.len());
    let mut last = 0;

    for url in RE_URL.find_iter(&escaped) {
        html.push_str(&linkify_emails(&escaped[last..url.start()]));
        html.push_str(&format!(r#"<a href="{0}">{0}</a>"#, url.as_str()));
        last = url.end();
    }
    html.push_str(&linkify_emails(&escaped[last..]));
    html
}

fn linkify_emails(text: &str) -> std::borrow::Cow<'_, str> {
    RE_EMAIL.replace_all(text, |caps: &regex::Captures| {
        let email = &caps[0];
        format!(r#"<a href="mailto:{}">{}</a>"#, email, email)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::Composer;
    use crate::model::ReportRecord;
    use std::collections::BTreeSet;

    fn render(json: &str) -> String {
        let report = ReportRecord::from_json(json).unwrap();
        let output = Composer::default()
            .compose(&report, &[], &BTreeSet::from([Target::Markup]))
            .unwrap();
        String::from_utf8(output.output(Target::Markup).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"l'eau\"</b>"), "&lt;b&gt;&quot;l&#x27;eau&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_linkify_email() {
        let html = linkify_urls_and_emails("Contact: contact@piscine.fr");
        assert_eq!(
            html,
            r#"Contact: <a href="mailto:contact@piscine.fr">contact@piscine.fr</a>"#
        );
    }

    #[test]
    fn test_linkify_url_with_embedded_address() {
        let html = linkify_urls_and_emails(
            "Portail https://user@portail.piscine.fr/rapport ou support@piscine.fr",
        );
        assert_eq!(html.matches("<a ").count(), 2);
        assert!(html.contains(
            r#"<a href="https://user@portail.piscine.fr/rapport">https://user@portail.piscine.fr/rapport</a>"#
        ));
        assert!(html.contains(r#"<a href="mailto:support@piscine.fr">support@piscine.fr</a>"#));
        assert!(!html.contains("mailto:user@"));
    }

    #[test]
    fn test_pt_formatting() {
        assert_eq!(pt(40.0), "40pt");
        assert_eq!(pt(12.5), "12.5pt");
        assert_eq!(pt(1.0 / 3.0), "0.33pt");
    }

    #[test]
    fn test_document_structure() {
        let html = render(
            r#"{"client": {"nom": "Durand"}, "inspection": {"date": "2024-05-14"},
                "conformite": [{"element": "Skimmer", "statut": "Non conforme"},
                               {"element": "Bonde", "statut": "Conforme"}]}"#,
        );
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("@page { size: 595pt 842pt; margin: 0; }"));
        assert!(html.contains("data-section=\"identification\""));
        assert!(html.contains("data-section=\"conformity\""));
        assert_eq!(html.matches("<tr data-flag=\"non-conforming\"").count(), 1);
        assert!(html.contains("Page 2 / 3"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render(
            r#"{"client": {"nom": "Durand <script>"}, "inspection": {"date": "2024-05-14"}}"#,
        );
        assert!(html.contains("Durand &lt;script&gt;"));
        assert!(!html.contains("<script"));
    }
}
