//! PDF writing module.
//!
//! ## Architecture
//!
//! ```text
//! PagePlan (layout)
//!     ↓
//! [CanvasRenderer] (converters::canvas)
//!     ↓
//! [ContentStreamBuilder] + [Table] (drawing operators per page)
//!     ↓
//! [PdfWriter] (assembles complete PDF structure)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! ## Low-Level API
//!
//! ```
//! use report_oxide::writer::PdfWriter;
//!
//! let mut writer = PdfWriter::new();
//! writer.add_a4_page().content().text("Helvetica", 12.0, 72.0, 720.0, "Bonjour");
//! let bytes = writer.finish().unwrap();
//! assert!(bytes.starts_with(b"%PDF-1.7"));
//! ```

mod content_stream;
mod font_manager;
mod image_handler;
mod object_serializer;
mod pdf_writer;
mod table_renderer;

pub use content_stream::{encode_win_ansi, ContentStreamBuilder, ContentStreamOp};
pub use font_manager::{Base14Font, Base14Metrics};
pub use image_handler::{ColorSpace, ImageData, ImageError, ImageFormat};
pub(crate) use image_handler::parse_jpeg_header;
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{PageBuilder, PdfWriter, PdfWriterConfig};
pub use table_renderer::{
    Borders, CellPadding, CellPosition, ColumnWidth, FontMetrics, Table, TableBorderStyle,
    TableCell, TableLayout, TableRow, TableStyle,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _serializer = ObjectSerializer::new();
        let _builder = ContentStreamBuilder::new();
        assert!(Base14Metrics::default().text_width("a", 10.0) > 0.0);
    }
}
