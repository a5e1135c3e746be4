//! Page geometry and the vertical cursor used during pagination.
//!
//! All coordinates are in points, measured from the top-left corner of the
//! page. Renderers that use a bottom-up coordinate space (PDF) convert with
//! [`Rect::flipped`].

use serde::{Deserialize, Serialize};

/// Absorbs float accumulation when a block ends exactly on the footer band.
const FIT_TOLERANCE: f32 = 0.01;

/// Fixed page geometry shared by every target of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    /// Page width
    pub width: f32,
    /// Page height
    pub height: f32,
    /// Left and right margin
    pub margin: f32,
    /// Height reserved at the top of every body page for the header band
    pub header_reserved: f32,
    /// Height reserved at the bottom of every body page for the footer band
    pub footer_reserved: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    /// A4 portrait (595 x 842 pt) with the default bands.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_oxide::geometry::PageGeometry;
    ///
    /// let page = PageGeometry::a4();
    /// assert_eq!(page.content_width(), 515.0);
    /// assert_eq!(page.body_height(), 682.0);
    /// ```
    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin: 40.0,
            header_reserved: 96.0,
            footer_reserved: 64.0,
        }
    }

    /// Width available to content between the side margins.
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// First usable offset below the header band.
    pub fn body_top(&self) -> f32 {
        self.header_reserved
    }

    /// Last usable offset above the footer band.
    pub fn body_bottom(&self) -> f32 {
        self.height - self.footer_reserved
    }

    /// Usable height of one page body.
    pub fn body_height(&self) -> f32 {
        self.body_bottom() - self.body_top()
    }

    /// Rectangle of the page body.
    pub fn body_rect(&self) -> Rect {
        Rect::new(self.margin, self.body_top(), self.content_width(), self.body_height())
    }
}

/// Mutable page/offset tracker.
///
/// Created at the start of a pagination pass, advanced by every placed block and
/// reset to `header_reserved` on every page break.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// Zero-based index of the current page
    pub page_index: usize,
    /// Current vertical offset from the top of the page
    pub offset: f32,
}

impl Cursor {
    /// Cursor at the top of the body of the first page.
    pub fn new(geometry: &PageGeometry) -> Self {
        Self {
            page_index: 0,
            offset: geometry.body_top(),
        }
    }

    /// Whether a block of height `h` fits below the current offset.
    pub fn fits(&self, h: f32, geometry: &PageGeometry) -> bool {
        self.offset + h <= geometry.body_bottom() + FIT_TOLERANCE
    }

    /// Space left on the current page.
    pub fn remaining(&self, geometry: &PageGeometry) -> f32 {
        (geometry.body_bottom() - self.offset).max(0.0)
    }

    /// Whether nothing has been placed on the current page yet.
    pub fn at_top(&self, geometry: &PageGeometry) -> bool {
        self.offset <= geometry.body_top()
    }

    /// Move the cursor down.
    pub fn advance(&mut self, h: f32) {
        self.offset += h;
    }

    /// Start a new page.
    pub fn break_page(&mut self, geometry: &PageGeometry) {
        self.page_index += 1;
        self.offset = geometry.body_top();
    }
}

/// A rectangle in page space (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: f32,
    /// Y coordinate of top-left corner
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// The same rectangle in a bottom-up coordinate space of the given page
    /// height; `y` becomes the lower edge.
    ///
    /// # Examples
    ///
    /// ```
    /// use report_oxide::geometry::Rect;
    ///
    /// let r = Rect::new(40.0, 100.0, 200.0, 50.0).flipped(842.0);
    /// assert_eq!(r.y, 692.0);
    /// ```
    pub fn flipped(&self, page_height: f32) -> Rect {
        Rect::new(self.x, page_height - self.y - self.height, self.width, self.height)
    }
}

/// Scale `(width, height)` to fit inside `(max_width, max_height)` while
/// preserving the aspect ratio. Images smaller than the box are not enlarged.
pub fn fit_within(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

/// Scale `(width, height)` to fill `(max_width, max_height)` as far as the
/// aspect ratio allows, enlarging small images.
pub fn fit_to_box(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    let aspect = width / height;
    if aspect > max_width / max_height {
        (max_width, max_width / aspect)
    } else {
        (max_height * aspect, max_height)
    }
}
