//! Block measurement.
//!
//! One function measures every block for every target; only the font
//! metrics change between targets.

use super::{PlacedContent, PlacedImage, TextLine};
use crate::config::{ComposeConfig, Palette, Typography};
use crate::error::Result;
use crate::geometry::fit_to_box;
use crate::model::ImageCatalog;
use crate::sections::{Block, FigureImage, ImageBlock, ImageLayout, RowFlag, TableBlock, TableKind};
use crate::text::wrap_text;
use crate::writer::{
    Borders, CellPadding, ColumnWidth, FontMetrics, Table, TableBorderStyle, TableCell, TableRow,
    TableStyle,
};

/// Vertical padding above and below a section title.
pub const HEADING_PADDING: f32 = 5.0;
/// Horizontal inset of section title text inside its band.
pub const TITLE_INSET: f32 = 8.0;
/// Indent of bullet item text.
pub const BULLET_INDENT: f32 = 14.0;
/// Space between bullet items.
pub const BULLET_GAP: f32 = 3.0;
/// Space between a photo and its caption.
pub const CAPTION_GAP: f32 = 4.0;
/// Space between the two photos of a pair.
pub const GUTTER: f32 = 16.0;
/// Space after every block.
pub const BLOCK_GAP: f32 = 10.0;

/// Result of measuring one block.
#[derive(Debug, Clone, PartialEq)]
pub struct Measured {
    /// Natural height
    pub height: f32,
    /// Laid-out content
    pub content: PlacedContent,
    /// Whether the block may split across pages (free text only)
    pub splittable: bool,
    /// Height of the smallest leading piece: the first line of free text,
    /// the whole block otherwise
    pub first_unit: f32,
}

/// Height of a run of free-text lines; paragraphs are separated by half a line.
pub fn text_height(lines: &[TextLine], line_height: f32) -> f32 {
    let breaks = lines
        .windows(2)
        .filter(|pair| pair[0].paragraph != pair[1].paragraph)
        .count();
    lines.len() as f32 * line_height + breaks as f32 * line_height * 0.5
}

/// Writer table for a table block, styled from the palette.
pub fn build_table(block: &TableBlock, typography: &Typography, palette: &Palette) -> Table {
    let style = TableStyle::new()
        .font(typography.table_size, typography.line_spacing)
        .cell_padding(CellPadding::symmetric(5.0, 4.0))
        .cell_borders(Borders::all(TableBorderStyle::new(0.5).with_color(palette.border)))
        .text_color(palette.text)
        .header(Some(palette.table_header_background), palette.table_header_text);

    let mut rows = Vec::with_capacity(block.rows.len() + 1);
    if block.kind == TableKind::Grid && !block.headers.is_empty() {
        rows.push(TableRow::header(block.headers.iter().map(TableCell::text).collect()));
    }
    for row in &block.rows {
        let cells = row
            .cells
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let cell = TableCell::text(text);
                if block.kind == TableKind::KeyValue && i == 0 {
                    cell.bold()
                } else {
                    cell
                }
            })
            .collect();
        let table_row = TableRow::new(cells);
        rows.push(match row.flag {
            RowFlag::Normal => table_row,
            RowFlag::NonConforming => table_row
                .background(palette.alert_background)
                .text_color(palette.alert),
            RowFlag::Watch => table_row
                .background(palette.watch_background)
                .text_color(palette.watch),
        });
    }

    let widths = match (block.kind, block.column_count()) {
        (TableKind::KeyValue, _) => vec![ColumnWidth::Percent(35.0), ColumnWidth::Percent(65.0)],
        (TableKind::Grid, 2) => vec![ColumnWidth::Weight(3.0), ColumnWidth::Weight(1.0)],
        (TableKind::Grid, 3) => vec![
            ColumnWidth::Weight(3.0),
            ColumnWidth::Weight(2.0),
            ColumnWidth::Weight(4.0),
        ],
        (TableKind::Grid, n) => vec![ColumnWidth::Weight(1.0); n],
    };

    Table::from_rows(rows)
        .with_style(style)
        .with_column_widths(widths)
}

/// Measures blocks with one target's metrics.
pub struct BlockMeasurer<'a> {
    metrics: &'a dyn FontMetrics,
    config: &'a ComposeConfig,
    catalog: &'a ImageCatalog,
}

impl<'a> BlockMeasurer<'a> {
    /// Create a measurer.
    pub fn new(
        metrics: &'a dyn FontMetrics,
        config: &'a ComposeConfig,
        catalog: &'a ImageCatalog,
    ) -> Self {
        Self {
            metrics,
            config,
            catalog,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ComposeConfig {
        self.config
    }

    /// Font metrics in use.
    pub fn metrics(&self) -> &dyn FontMetrics {
        self.metrics
    }

    fn content_width(&self) -> f32 {
        self.config.geometry.content_width()
    }

    fn wrap(&self, text: &str, width: f32, size: f32, bold: bool) -> Vec<String> {
        wrap_text(text, width, |s| {
            if bold {
                self.metrics.bold_text_width(s, size)
            } else {
                self.metrics.text_width(s, size)
            }
        })
    }

    /// Measure a block.
    pub fn measure(&self, block: &Block) -> Result<Measured> {
        let typo = &self.config.typography;
        let measured = match block {
            Block::SectionTitle { text, .. } => {
                let size = typo.title_size;
                let lines = self.wrap(text, self.content_width() - 2.0 * TITLE_INSET, size, true);
                let height = lines.len() as f32 * typo.line_height(size) + 2.0 * HEADING_PADDING;
                atomic(height, PlacedContent::Heading { lines })
            },
            Block::Subtitle { text, .. } => {
                let size = typo.subtitle_size;
                let lines = self.wrap(text, self.content_width(), size, true);
                let height = lines.len() as f32 * typo.line_height(size) + HEADING_PADDING;
                atomic(height, PlacedContent::Heading { lines })
            },
            Block::Table(table) => {
                let layout = build_table(table, typo, &self.config.palette)
                    .calculate_layout(self.content_width(), self.metrics);
                atomic(layout.total_height, PlacedContent::Table { layout })
            },
            Block::BulletList(items) => {
                let size = typo.body_size;
                let width = self.content_width() - BULLET_INDENT;
                let items: Vec<Vec<String>> =
                    items.iter().map(|item| self.wrap(item, width, size, false)).collect();
                let line_count: usize = items.iter().map(Vec::len).sum();
                let height = line_count as f32 * typo.line_height(size)
                    + items.len().saturating_sub(1) as f32 * BULLET_GAP;
                atomic(height, PlacedContent::Bullets { items })
            },
            Block::Image(image) => {
                let placed = self.measure_images(image)?;
                let height = placed
                    .iter()
                    .map(|p| p.height + self.caption_height(&p.caption_lines))
                    .fold(0.0f32, f32::max);
                atomic(height, PlacedContent::Images(placed))
            },
            Block::FreeText(paragraphs) => {
                let size = typo.body_size;
                let lines: Vec<TextLine> = paragraphs
                    .iter()
                    .enumerate()
                    .flat_map(|(paragraph, text)| {
                        self.wrap(text, self.content_width(), size, false)
                            .into_iter()
                            .map(move |text| TextLine { paragraph, text })
                    })
                    .collect();
                let line_height = typo.line_height(size);
                Measured {
                    height: text_height(&lines, line_height),
                    content: PlacedContent::TextLines(lines),
                    splittable: true,
                    first_unit: line_height,
                }
            },
        };
        Ok(measured)
    }

    /// Height of a wrapped caption including its gap; zero without caption.
    pub fn caption_height(&self, lines: &[String]) -> f32 {
        if lines.is_empty() {
            0.0
        } else {
            let typo = &self.config.typography;
            CAPTION_GAP + lines.len() as f32 * typo.line_height(typo.caption_size)
        }
    }

    fn measure_images(&self, block: &ImageBlock) -> Result<Vec<PlacedImage>> {
        let content_width = self.content_width();
        let (slot_width, max_height) = match block.layout {
            ImageLayout::Single => (content_width, self.config.single_image_max_height),
            ImageLayout::Paired => (
                (content_width - GUTTER) / 2.0,
                self.config.paired_image_max_height,
            ),
        };

        block
            .figures()
            .enumerate()
            .map(|(slot, figure)| {
                let slot_offset = slot as f32 * (slot_width + GUTTER);
                self.place_figure(figure, slot_offset, slot_width, max_height)
            })
            .collect()
    }

    fn place_figure(
        &self,
        figure: &FigureImage,
        slot_offset: f32,
        slot_width: f32,
        max_height: f32,
    ) -> Result<PlacedImage> {
        let info = self.catalog.require(figure.id)?;
        let (width, height) =
            fit_to_box(info.width as f32, info.height as f32, slot_width, max_height);
        let caption_lines = figure
            .caption
            .as_deref()
            .map(|c| self.wrap(c, slot_width, self.config.typography.caption_size, false))
            .unwrap_or_default();

        Ok(PlacedImage {
            id: figure.id,
            x_offset: slot_offset + (slot_width - width) / 2.0,
            width,
            height,
            slot_offset,
            slot_width,
            caption_lines,
        })
    }
}

fn atomic(height: f32, content: PlacedContent) -> Measured {
    Measured {
        height,
        content,
        splittable: false,
        first_unit: height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageId, ImageInfo, ImageKind};
    use crate::sections::{Accent, SectionId, TableRowBlock};
    use crate::writer::Base14Metrics;
    use std::collections::BTreeMap;

    fn catalog(sizes: &[(u32, u32)]) -> ImageCatalog {
        let entries: BTreeMap<ImageId, ImageInfo> = sizes
            .iter()
            .enumerate()
            .map(|(i, (w, h))| {
                (
                    ImageId(i),
                    ImageInfo {
                        width: *w,
                        height: *h,
                        kind: ImageKind::Png,
                    },
                )
            })
            .collect();
        ImageCatalog::from_entries(entries)
    }

    fn figure(id: usize, caption: Option<&str>) -> FigureImage {
        FigureImage {
            id: ImageId(id),
            caption: caption.map(str::to_string),
        }
    }

    #[test]
    fn test_single_image_fills_width_within_max_height() {
        let config = ComposeConfig::new();
        let catalog = catalog(&[(1030, 515)]);
        let metrics = Base14Metrics::helvetica();
        let measurer = BlockMeasurer::new(&metrics, &config, &catalog);

        let block = Block::Image(ImageBlock {
            first: figure(0, None),
            second: None,
            layout: ImageLayout::Single,
        });
        let m = measurer.measure(&block).unwrap();
        let PlacedContent::Images(placed) = &m.content else {
            panic!("expected images");
        };
        assert_eq!(placed[0].width, 515.0);
        assert!((placed[0].height - 257.5).abs() < 1e-3);
        assert!((m.height - 257.5).abs() < 1e-3);
        assert!(!m.splittable);
    }

    #[test]
    fn test_lone_paired_image_sits_left() {
        let config = ComposeConfig::new();
        let catalog = catalog(&[(400, 400)]);
        let metrics = Base14Metrics::helvetica();
        let measurer = BlockMeasurer::new(&metrics, &config, &catalog);

        let block = Block::Image(ImageBlock {
            first: figure(0, Some("pH 7.2")),
            second: None,
            layout: ImageLayout::Paired,
        });
        let m = measurer.measure(&block).unwrap();
        let PlacedContent::Images(placed) = &m.content else {
            panic!("expected images");
        };
        let half = (515.0 - GUTTER) / 2.0;
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].slot_offset, 0.0);
        assert_eq!(placed[0].slot_width, half);
        assert!(placed[0].x_offset + placed[0].width <= half + 1e-3);
        assert_eq!(placed[0].caption_lines, vec!["pH 7.2".to_string()]);
        assert!(m.height > placed[0].height);
    }

    #[test]
    fn test_unknown_image_is_layout_error() {
        let config = ComposeConfig::new();
        let catalog = catalog(&[]);
        let metrics = Base14Metrics::helvetica();
        let measurer = BlockMeasurer::new(&metrics, &config, &catalog);
        let block = Block::Image(ImageBlock {
            first: figure(3, None),
            second: None,
            layout: ImageLayout::Single,
        });
        assert!(measurer.measure(&block).is_err());
    }

    #[test]
    fn test_free_text_is_splittable() {
        let config = ComposeConfig::new();
        let catalog = catalog(&[]);
        let metrics = Base14Metrics::helvetica();
        let measurer = BlockMeasurer::new(&metrics, &config, &catalog);

        let m = measurer
            .measure(&Block::FreeText(vec!["Un.".to_string(), "Deux.".to_string()]))
            .unwrap();
        let lh = config.typography.line_height(config.typography.body_size);
        assert!(m.splittable);
        assert_eq!(m.first_unit, lh);
        assert!((m.height - 2.5 * lh).abs() < 1e-3);
    }

    #[test]
    fn test_heading_heights() {
        let config = ComposeConfig::new();
        let catalog = catalog(&[]);
        let metrics = Base14Metrics::helvetica();
        let measurer = BlockMeasurer::new(&metrics, &config, &catalog);

        let m = measurer.measure(&Block::title(SectionId::Summary, Accent::Primary)).unwrap();
        let expected = config.typography.line_height(config.typography.title_size) + 10.0;
        assert!((m.height - expected).abs() < 1e-3);
    }

    #[test]
    fn test_flagged_rows_take_palette_colours() {
        let palette = Palette::default();
        let block = TableBlock {
            kind: TableKind::Grid,
            headers: vec!["Élément".to_string(), "Statut".to_string()],
            rows: vec![
                TableRowBlock::new(vec!["Liner".to_string(), "Conforme".to_string()]),
                TableRowBlock::flagged(
                    vec!["Skimmer".to_string(), "Non conforme".to_string()],
                    RowFlag::NonConforming,
                ),
            ],
        };
        let table = build_table(&block, &Typography::default(), &palette);
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows[0].is_header);
        assert_eq!(table.rows[1].background, None);
        assert_eq!(table.rows[2].background, Some(palette.alert_background));
        assert_eq!(table.rows[2].text_color, Some(palette.alert));
        assert_eq!(
            table.column_widths,
            vec![ColumnWidth::Weight(3.0), ColumnWidth::Weight(1.0)]
        );
    }

    #[test]
    fn test_text_height_counts_paragraph_breaks() {
        let lines = vec![
            TextLine { paragraph: 0, text: "a".to_string() },
            TextLine { paragraph: 0, text: "b".to_string() },
            TextLine { paragraph: 1, text: "c".to_string() },
        ];
        assert_eq!(text_height(&lines, 10.0), 35.0);
        assert_eq!(text_height(&[], 10.0), 0.0);
    }
}
