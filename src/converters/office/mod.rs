//! Editable Office Open XML (DOCX) output.
//!
//! The document is written as WordprocessingML with quick-xml and packaged
//! with zip:
//! - every plan page starts with an explicit page break, so Word keeps the
//!   block-to-page assignment of the plan
//! - section titles are `Heading1` paragraphs wrapped in a `section-<key>`
//!   bookmark, which also feeds Word's navigation pane
//! - header and footer bands live in `header1.xml`/`footer1.xml` with
//!   `PAGE`/`NUMPAGES` fields
//! - the cover and closing pages carry no bands
//!
//! Package entries use a fixed timestamp and order; the only varying bytes
//! are the core-properties dates, pinned with
//! [`OfficeOptions::timestamp`](crate::config::OfficeOptions::timestamp).
//!
//! # Feature Flag
//!
//! Rendering requires the `office` feature (enabled by default):
//!
//! ```toml
//! [dependencies]
//! report_oxide = { version = "0.1", features = ["office"] }
//! ```

#[cfg(feature = "office")]
mod docx;
#[cfg(feature = "office")]
mod package;
pub mod styles;

#[cfg(feature = "office")]
pub use docx::DocxRenderer;

use crate::geometry::PageGeometry;

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    /// Top margin in points
    pub top: f32,
    /// Bottom margin in points
    pub bottom: f32,
    /// Left margin in points
    pub left: f32,
    /// Right margin in points
    pub right: f32,
    /// Distance from the page top to the header band
    pub header: f32,
    /// Distance from the page bottom to the footer band
    pub footer: f32,
}

impl Margins {
    /// Margins reproducing the body area of a page geometry.
    pub fn from_geometry(geometry: &PageGeometry) -> Self {
        Self {
            top: geometry.header_reserved,
            bottom: geometry.footer_reserved,
            left: geometry.margin,
            right: geometry.margin,
            header: 24.0,
            footer: 16.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margins_from_geometry() {
        let margins = Margins::from_geometry(&PageGeometry::a4());
        assert_eq!(margins.top, 96.0);
        assert_eq!(margins.bottom, 64.0);
        assert_eq!(margins.left, 40.0);
        assert_eq!(margins.right, 40.0);
    }
}
