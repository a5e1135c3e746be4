//! Table rendering for PDF generation.
//!
//! Layout calculation (column widths, wrapped row heights, cell positions)
//! is shared with the pagination engine, so a table measured for a page is
//! drawn with exactly the geometry that was measured.
//!
//! # Example
//!
//! ```
//! use report_oxide::writer::{Base14Metrics, ColumnWidth, Table, TableCell, TableRow};
//!
//! let table = Table::from_rows(vec![
//!     TableRow::header(vec![TableCell::text("Équipement"), TableCell::text("Quantité")]),
//!     TableRow::new(vec![TableCell::text("Skimmer"), TableCell::text("2")]),
//! ])
//! .with_column_widths(vec![ColumnWidth::Weight(3.0), ColumnWidth::Weight(1.0)]);
//!
//! let layout = table.calculate_layout(400.0, &Base14Metrics::helvetica());
//! assert_eq!(layout.column_widths, vec![300.0, 100.0]);
//! assert_eq!(layout.row_heights.len(), 2);
//! ```

use super::content_stream::ContentStreamBuilder;
use super::font_manager::Base14Font;
use crate::config::Rgb;
use crate::text::wrap_text;

/// Column width specification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    /// Percentage of table width
    Percent(f32),
    /// Proportional weight (flex)
    Weight(f32),
}

impl Default for ColumnWidth {
    fn default() -> Self {
        Self::Weight(1.0)
    }
}

/// Border style for tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableBorderStyle {
    /// Border width in points
    pub width: f32,
    /// Border color
    pub color: Rgb,
}

impl Default for TableBorderStyle {
    fn default() -> Self {
        Self {
            width: 0.5,
            color: Rgb(0, 0, 0),
        }
    }
}

impl TableBorderStyle {
    /// Create a new border style.
    pub fn new(width: f32) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    /// Create a border with specific color.
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }
}

/// Border configuration for a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Borders {
    /// Top border
    pub top: Option<TableBorderStyle>,
    /// Right border
    pub right: Option<TableBorderStyle>,
    /// Bottom border
    pub bottom: Option<TableBorderStyle>,
    /// Left border
    pub left: Option<TableBorderStyle>,
}

impl Borders {
    /// All borders with the same style.
    pub fn all(style: TableBorderStyle) -> Self {
        Self {
            top: Some(style),
            right: Some(style),
            bottom: Some(style),
            left: Some(style),
        }
    }
}

/// Cell padding configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPadding {
    /// Top padding in points
    pub top: f32,
    /// Right padding in points
    pub right: f32,
    /// Bottom padding in points
    pub bottom: f32,
    /// Left padding in points
    pub left: f32,
}

impl Default for CellPadding {
    fn default() -> Self {
        Self::symmetric(4.0, 4.0)
    }
}

impl CellPadding {

    /// Create padding with horizontal and vertical values.
    pub fn symmetric(horizontal: f32, vertical: f32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    /// Total horizontal padding.
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Total vertical padding.
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    /// Cell content (text)
    pub content: String,
    /// Bold text
    pub bold: bool,
}

impl TableCell {
    /// Create a new text cell.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            bold: false,
        }
    }

    /// Set bold style.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Cells in this row
    pub cells: Vec<TableCell>,
    /// Row background
    pub background: Option<Rgb>,
    /// Row text colour override
    pub text_color: Option<Rgb>,
    /// Whether this is a header row
    pub is_header: bool,
}

impl TableRow {
    /// Create a new row from cells.
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self {
            cells,
            background: None,
            text_color: None,
            is_header: false,
        }
    }

    /// Create a header row.
    pub fn header(cells: Vec<TableCell>) -> Self {
        Self {
            is_header: true,
            ..Self::new(cells)
        }
    }

    /// Set row background.
    pub fn background(mut self, color: Rgb) -> Self {
        self.background = Some(color);
        self
    }

    /// Set row text colour.
    pub fn text_color(mut self, color: Rgb) -> Self {
        self.text_color = Some(color);
        self
    }
}

/// Table style configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    /// Default cell padding
    pub cell_padding: CellPadding,
    /// Default cell borders
    pub cell_borders: Borders,
    /// Default font size
    pub font_size: f32,
    /// Line height as a multiple of the font size
    pub line_height_factor: f32,
    /// Body text colour
    pub text_color: Rgb,
    /// Header row background color
    pub header_background: Option<Rgb>,
    /// Header row text colour
    pub header_text_color: Rgb,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            cell_padding: CellPadding::default(),
            cell_borders: Borders::all(TableBorderStyle::new(0.25)),
            font_size: 10.0,
            line_height_factor: 1.2,
            text_color: Rgb(0, 0, 0),
            header_background: Some(Rgb(0xE6, 0xE6, 0xE6)),
            header_text_color: Rgb(0, 0, 0),
        }
    }
}

impl TableStyle {
    /// Create a new default style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cell padding.
    pub fn cell_padding(mut self, padding: CellPadding) -> Self {
        self.cell_padding = padding;
        self
    }

    /// Set cell borders.
    pub fn cell_borders(mut self, borders: Borders) -> Self {
        self.cell_borders = borders;
        self
    }

    /// Set font size and line height factor.
    pub fn font(mut self, size: f32, line_height_factor: f32) -> Self {
        self.font_size = size;
        self.line_height_factor = line_height_factor;
        self
    }

    /// Set body text colour.
    pub fn text_color(mut self, color: Rgb) -> Self {
        self.text_color = color;
        self
    }

    /// Set header colours.
    pub fn header(mut self, background: Option<Rgb>, text: Rgb) -> Self {
        self.header_background = background;
        self.header_text_color = text;
        self
    }

    /// Line height in points.
    pub fn line_height(&self) -> f32 {
        self.font_size * self.line_height_factor
    }
}

/// A complete table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table rows
    pub rows: Vec<TableRow>,
    /// Column widths
    pub column_widths: Vec<ColumnWidth>,
    /// Table style
    pub style: TableStyle,
}

impl Table {
    /// Create a table from TableRow objects.
    pub fn from_rows(rows: Vec<TableRow>) -> Self {
        let num_cols = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        Self {
            rows,
            column_widths: vec![ColumnWidth::default(); num_cols],
            style: TableStyle::default(),
        }
    }

    /// Set table style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    /// Set column widths.
    pub fn with_column_widths(mut self, widths: Vec<ColumnWidth>) -> Self {
        self.column_widths = widths;
        self
    }

    /// Get the number of columns.
    pub fn num_columns(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    fn is_bold(&self, row: &TableRow, cell: &TableCell) -> bool {
        cell.bold || row.is_header
    }

    fn measure(&self, bold: bool, text: &str, metrics: &dyn FontMetrics) -> f32 {
        if bold {
            metrics.bold_text_width(text, self.style.font_size)
        } else {
            metrics.text_width(text, self.style.font_size)
        }
    }

    /// Wrapped lines of a cell at the given column width.
    pub fn cell_lines(
        &self,
        row: &TableRow,
        cell: &TableCell,
        cell_width: f32,
        metrics: &dyn FontMetrics,
    ) -> Vec<String> {
        let bold = self.is_bold(row, cell);
        let content_width = (cell_width - self.style.cell_padding.horizontal()).max(1.0);
        wrap_text(&cell.content, content_width, |s| self.measure(bold, s, metrics))
    }
}

/// Calculated layout for a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    /// Calculated column widths in points
    pub column_widths: Vec<f32>,
    /// Calculated row heights in points
    pub row_heights: Vec<f32>,
    /// Total table width
    pub total_width: f32,
    /// Total table height
    pub total_height: f32,
    /// Cell positions (row, col) -> (x, y, width, height)
    pub cell_positions: Vec<Vec<CellPosition>>,
}

/// Position and size of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPosition {
    /// X position (left edge)
    pub x: f32,
    /// Y position (top edge, relative to table top)
    pub y: f32,
    /// Cell width
    pub width: f32,
    /// Cell height
    pub height: f32,
}

impl Table {
    /// Calculate the layout for this table at the full available width.
    pub fn calculate_layout(
        &self,
        available_width: f32,
        font_metrics: &dyn FontMetrics,
    ) -> TableLayout {
        let num_cols = self.num_columns();
        if num_cols == 0 || self.rows.is_empty() {
            return TableLayout {
                column_widths: vec![],
                row_heights: vec![],
                total_width: 0.0,
                total_height: 0.0,
                cell_positions: vec![],
            };
        }

        let column_widths = self.calculate_column_widths(available_width, num_cols);
        let row_heights = self.calculate_row_heights(&column_widths, font_metrics);
        let cell_positions = self.calculate_cell_positions(&column_widths, &row_heights);

        TableLayout {
            total_width: column_widths.iter().sum(),
            total_height: row_heights.iter().sum(),
            column_widths,
            row_heights,
            cell_positions,
        }
    }

    fn calculate_column_widths(&self, table_width: f32, num_cols: usize) -> Vec<f32> {
        let mut widths = vec![0.0f32; num_cols];
        let mut weight_total = 0.0f32;

        for (col, width) in widths.iter_mut().enumerate() {
            match self.column_widths.get(col).copied().unwrap_or_default() {
                ColumnWidth::Percent(p) => *width = table_width * (p / 100.0),
                ColumnWidth::Weight(w) => weight_total += w,
            }
        }

        // weighted columns share what the others leave
        let used_width: f32 = widths.iter().sum();
        let remaining = (table_width - used_width).max(0.0);
        if weight_total > 0.0 && remaining > 0.0 {
            for (col, width) in widths.iter_mut().enumerate() {
                let spec = self.column_widths.get(col).copied().unwrap_or_default();
                if let ColumnWidth::Weight(w) = spec {
                    *width = remaining * (w / weight_total);
                }
            }
        }

        let total: f32 = widths.iter().sum();
        if total > table_width && total > 0.0 {
            let scale = table_width / total;
            for w in &mut widths {
                *w *= scale;
            }
        }

        widths
    }

    fn calculate_row_heights(
        &self,
        column_widths: &[f32],
        font_metrics: &dyn FontMetrics,
    ) -> Vec<f32> {
        let line_height = self.style.line_height();
        let padding = self.style.cell_padding.vertical();

        self.rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .zip(column_widths)
                    .map(|(cell, width)| {
                        let lines = self.cell_lines(row, cell, *width, font_metrics);
                        lines.len() as f32 * line_height + padding
                    })
                    .fold(0.0f32, f32::max)
                    .max(self.style.font_size * 1.5)
            })
            .collect()
    }

    fn calculate_cell_positions(
        &self,
        column_widths: &[f32],
        row_heights: &[f32],
    ) -> Vec<Vec<CellPosition>> {
        let mut positions = Vec::with_capacity(self.rows.len());
        let mut y = 0.0;

        for (row, height) in self.rows.iter().zip(row_heights) {
            let mut x = 0.0;
            let row_positions = row
                .cells
                .iter()
                .zip(column_widths)
                .map(|(_, width)| {
                    let pos = CellPosition {
                        x,
                        y,
                        width: *width,
                        height: *height,
                    };
                    x += width;
                    pos
                })
                .collect();
            positions.push(row_positions);
            y += height;
        }

        positions
    }

    /// Render the table with its top-left corner at `(x, y)` in PDF space.
    pub fn render(
        &self,
        builder: &mut ContentStreamBuilder,
        x: f32,
        y: f32,
        layout: &TableLayout,
        font_metrics: &dyn FontMetrics,
    ) {
        let table_top = y;

        for (row_idx, row) in self.rows.iter().enumerate() {
            for (cell_idx, cell) in row.cells.iter().enumerate() {
                let Some(pos) = layout.cell_positions.get(row_idx).and_then(|r| r.get(cell_idx))
                else {
                    continue;
                };
                let cell_x = x + pos.x;
                let cell_y = table_top - pos.y - pos.height;

                let bg = row.background.or(if row.is_header {
                    self.style.header_background
                } else {
                    None
                });
                if let Some(color) = bg {
                    builder.fill_color(color).rect(cell_x, cell_y, pos.width, pos.height).fill();
                }

                self.draw_cell_borders(builder, cell_x, cell_y, pos.width, pos.height);
            }
        }

        let font_size = self.style.font_size;
        let line_height = self.style.line_height();
        // baseline offset of the first line inside its line box
        let ascent = (line_height - font_size) / 2.0 + font_size * 0.8;

        for (row_idx, row) in self.rows.iter().enumerate() {
            let color = if row.is_header {
                self.style.header_text_color
            } else {
                row.text_color.unwrap_or(self.style.text_color)
            };
            for (cell_idx, cell) in row.cells.iter().enumerate() {
                if cell.content.trim().is_empty() {
                    continue;
                }
                let Some(pos) = layout.cell_positions.get(row_idx).and_then(|r| r.get(cell_idx))
                else {
                    continue;
                };
                let padding = &self.style.cell_padding;
                let bold = self.is_bold(row, cell);
                let font = Base14Font::select(bold).resource_name();
                let text_x = x + pos.x + padding.left;
                let top = table_top - pos.y - padding.top;

                builder.fill_color(color);
                for (i, line) in self
                    .cell_lines(row, cell, pos.width, font_metrics)
                    .iter()
                    .enumerate()
                {
                    let baseline = top - ascent - i as f32 * line_height;
                    builder.text(font, font_size, text_x, baseline, line);
                }
            }
        }
    }

    fn draw_cell_borders(
        &self,
        builder: &mut ContentStreamBuilder,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) {
        let borders = &self.style.cell_borders;
        let edges = [
            (borders.top, (x, y + height), (x + width, y + height)),
            (borders.bottom, (x, y), (x + width, y)),
            (borders.left, (x, y), (x, y + height)),
            (borders.right, (x + width, y), (x + width, y + height)),
        ];
        for (border, from, to) in edges {
            if let Some(border) = border.filter(|b| b.width > 0.0) {
                builder
                    .stroke_color(border.color)
                    .set_line_width(border.width)
                    .move_to(from.0, from.1)
                    .line_to(to.0, to.1)
                    .stroke();
            }
        }
    }
}

/// Trait for font metrics needed for layout.
pub trait FontMetrics {
    /// Calculate the width of text in points.
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    /// Width of text in the bold face; defaults to the regular width.
    fn bold_text_width(&self, text: &str, font_size: f32) -> f32 {
        self.text_width(text, font_size)
    }
}
