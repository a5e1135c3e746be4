//! Pagination engine.
//!
//! Measures every [`Block`](crate::sections::Block) with a target's font
//! metrics and places it on fixed-geometry pages with a vertical cursor:
//! - headings are kept with the start of the following block
//! - tables and images never split; they move to the next page instead
//! - free text splits at line boundaries
//! - a block taller than a whole page body is scaled down to fit it
//!
//! The resulting [`PagePlan`] is the single source of layout truth for a
//! renderer. Renderers draw what the plan says and never re-measure.

mod measure;
mod paginator;

pub use measure::{
    build_table, text_height, BlockMeasurer, Measured, BLOCK_GAP, BULLET_GAP, BULLET_INDENT,
    CAPTION_GAP, GUTTER, HEADING_PADDING, TITLE_INSET,
};
pub use paginator::{PageState, PageStateMachine, Paginator};

use crate::config::ComposeConfig;
use crate::model::{ImageId, ReportRecord};
use crate::text::is_blank;
use crate::writer::TableLayout;
use serde::Serialize;

/// Role of a page in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageKind {
    /// Full-page cover
    Cover,
    /// Content page with header and footer bands
    Body,
    /// Full-page closing
    Closing,
}

/// Text of the header band when no header asset is available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderDescriptor {
    /// Company name
    pub title: String,
    /// Report title and client
    pub detail: String,
}

/// Footer band of a body page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterDescriptor {
    /// Company line
    pub text: String,
    /// "Page n / N"
    pub page_label: String,
}

/// One line of free text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLine {
    /// Index of the paragraph the line belongs to
    pub paragraph: usize,
    /// Line text
    pub text: String,
}

/// A photo positioned inside its block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedImage {
    /// Image reference
    pub id: ImageId,
    /// Horizontal offset from the left content edge
    pub x_offset: f32,
    /// Drawn width
    pub width: f32,
    /// Drawn height
    pub height: f32,
    /// Offset of the slot the photo and caption are centred in
    pub slot_offset: f32,
    /// Width of that slot
    pub slot_width: f32,
    /// Wrapped caption
    pub caption_lines: Vec<String>,
}

/// Measured content of a placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlacedContent {
    /// Section title or subtitle lines
    Heading {
        /// Wrapped heading lines
        lines: Vec<String>,
    },
    /// Table geometry
    Table {
        /// Column widths, row heights and cell positions
        #[serde(skip)]
        layout: TableLayout,
    },
    /// Bullet items, each wrapped
    Bullets {
        /// Lines per item
        items: Vec<Vec<String>>,
    },
    /// One or two photos
    Images(Vec<PlacedImage>),
    /// A run of free-text lines
    TextLines(Vec<TextLine>),
}

/// A block (or a slice of a splittable block) placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    /// Index of the block in the section model
    pub block: usize,
    /// Offset of the top edge from the top of the page
    pub top: f32,
    /// Height on the page, after scaling
    pub height: f32,
    /// Scale applied by the overflow guard (1.0 when unscaled)
    pub scale: f32,
    /// What to draw
    pub content: PlacedContent,
}

impl Placement {
    /// Whether the overflow guard shrank this block.
    pub fn is_scaled(&self) -> bool {
        self.scale < 1.0
    }

    /// Lower edge offset from the top of the page.
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// A page of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Page role
    pub kind: PageKind,
    /// One-based page number, counting cover and closing pages
    pub number: usize,
    /// Header band (body pages)
    pub header: Option<HeaderDescriptor>,
    /// Footer band (body pages)
    pub footer: Option<FooterDescriptor>,
    /// Placed blocks, top to bottom
    pub placements: Vec<Placement>,
}

impl Page {
    /// Page without bands or content.
    pub fn bare(kind: PageKind) -> Self {
        Self {
            kind,
            number: 0,
            header: None,
            footer: None,
            placements: Vec::new(),
        }
    }
}

/// Text of the cover page fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverText {
    /// Report title
    pub title: String,
    /// Client and inspection lines
    pub lines: Vec<String>,
}

/// Text of the closing page fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosingText {
    /// Lines, top to bottom
    pub lines: Vec<String>,
}

/// Fixed page furniture derived from the record and the branding.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFrame {
    /// Cover page text, when a cover is emitted
    pub cover: Option<CoverText>,
    /// Header band text
    pub header: HeaderDescriptor,
    /// Footer company line
    pub footer_text: String,
    /// Closing page text, when a closing page is emitted
    pub closing: Option<ClosingText>,
}

impl PageFrame {
    /// Frame for a record.
    pub fn new(report: &ReportRecord, config: &ComposeConfig) -> Self {
        let branding = &config.branding;
        let client = report.client.display_name();

        let cover = config.cover_page.then(|| {
            let mut lines = vec![client.clone(), report.client.full_address()];
            lines.push(format!("Intervention du {}", report.inspection.date.trim()));
            if !is_blank(&report.inspection.reference) {
                lines.push(format!("Référence : {}", report.inspection.reference.trim()));
            }
            lines.retain(|l| !is_blank(l));
            CoverText {
                title: branding.report_title.clone(),
                lines,
            }
        });

        let closing = config.closing_page.then(|| ClosingText {
            lines: [&branding.closing_text, &branding.company_name, &branding.contact]
                .into_iter()
                .filter(|l| !is_blank(l))
                .cloned()
                .collect(),
        });

        Self {
            cover,
            header: HeaderDescriptor {
                title: branding.company_name.clone(),
                detail: format!("{} - {}", branding.report_title, client),
            },
            footer_text: branding.company_name.clone(),
            closing,
        }
    }
}

/// The complete layout of one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePlan {
    /// Pages in order
    pub pages: Vec<Page>,
    /// Cover fallback text
    pub cover: Option<CoverText>,
    /// Closing fallback text
    pub closing: Option<ClosingText>,
}

impl PagePlan {
    /// Total number of pages.
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Content pages only.
    pub fn body_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| p.kind == PageKind::Body)
    }

    /// Zero-based indices of the pages holding a block.
    pub fn pages_of(&self, block: usize) -> Vec<usize> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.placements.iter().any(|pl| pl.block == block))
            .map(|(i, _)| i)
            .collect()
    }

    /// Every placement in document order.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.pages.iter().flat_map(|p| p.placements.iter())
    }
}

/// "Page n / N".
pub fn page_label(number: usize, total: usize) -> String {
    format!("Page {} / {}", number, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Client, Inspection};

    fn record() -> ReportRecord {
        ReportRecord {
            client: Client {
                last_name: "Durand".to_string(),
                city: "Nîmes".to_string(),
                ..Default::default()
            },
            inspection: Inspection {
                date: "2024-05-14".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_frame_follows_config() {
        let config = ComposeConfig::new().with_cover_pages(true, false);
        let frame = PageFrame::new(&record(), &config);

        let cover = frame.cover.unwrap();
        assert_eq!(cover.title, config.branding.report_title);
        assert!(cover.lines.contains(&"Durand".to_string()));
        assert!(cover.lines.contains(&"Intervention du 2024-05-14".to_string()));
        assert!(frame.closing.is_none());
        assert!(frame.header.detail.ends_with("Durand"));
    }

    #[test]
    fn test_page_label() {
        assert_eq!(page_label(2, 5), "Page 2 / 5");
    }
}
