//! Target renderers.
//!
//! Each renderer turns a [`PagePlan`] into the bytes of one format:
//! - **Canvas**: paginated PDF
//! - **Office**: editable DOCX (requires the `office` feature)
//! - **Markup**: self-contained HTML
//!
//! Renderers only draw. Section presence, block order and page breaks all
//! come from the section model and the plan; colours, sizes and radii come
//! from the configuration.
//!
//! # Examples
//!
//! ```no_run
//! use report_oxide::converters::renderer_for;
//! use report_oxide::Target;
//!
//! let renderer = renderer_for(Target::Markup)?;
//! assert_eq!(renderer.target(), Target::Markup);
//! # Ok::<(), report_oxide::Error>(())
//! ```

pub mod canvas;
pub mod html;
pub mod office;

pub use canvas::CanvasRenderer;
pub use html::HtmlRenderer;
#[cfg(feature = "office")]
pub use office::DocxRenderer;

use crate::assets::LoadedAssets;
use crate::compose::Target;
use crate::config::{ComposeConfig, Palette, Rgb};
use crate::error::{Error, Result};
use crate::layout::{PagePlan, PlacedContent, PlacedImage, Placement};
use crate::model::{ImageCatalog, ImageKind, ImageRecord, ReportRecord};
use crate::sections::{Accent, Block, RowFlag};
use crate::writer::FontMetrics;

/// Shared, read-only inputs of every renderer in a run.
pub struct RenderContext<'a> {
    /// Source record (document metadata)
    pub report: &'a ReportRecord,
    /// Section model
    pub blocks: &'a [Block],
    /// Input photos
    pub images: &'a [ImageRecord],
    /// Dimensions of the placed photos
    pub catalog: &'a ImageCatalog,
    /// Branding assets of the run
    pub assets: &'a LoadedAssets,
    /// Configuration
    pub config: &'a ComposeConfig,
}

impl<'a> RenderContext<'a> {
    /// Block referenced by a placement.
    pub fn block(&self, index: usize) -> Result<&'a Block> {
        self.blocks
            .get(index)
            .ok_or_else(|| Error::Layout(format!("placement refers to missing block #{}", index)))
    }

    /// Bytes of an input photo.
    pub fn image_data(&self, index: usize) -> Result<&'a [u8]> {
        self.images
            .get(index)
            .map(|r| r.data.as_slice())
            .ok_or_else(|| Error::Layout(format!("placement refers to missing image #{}", index)))
    }

    /// Document title: report title and client.
    pub fn document_title(&self) -> String {
        let client = self.report.client.display_name();
        format!("{} - {}", self.config.branding.report_title, client)
    }
}

/// One output format.
pub trait Renderer {
    /// Target produced.
    fn target(&self) -> Target;

    /// Font metrics used to paginate for this target.
    fn metrics(&self) -> Box<dyn FontMetrics>;

    /// Render a plan.
    fn render(&self, context: &RenderContext<'_>, plan: &PagePlan) -> Result<Vec<u8>>;
}

/// Renderer for a target.
pub fn renderer_for(target: Target) -> Result<Box<dyn Renderer>> {
    match target {
        Target::Canvas => Ok(Box::new(CanvasRenderer::new())),
        Target::Markup => Ok(Box::new(HtmlRenderer::new())),
        #[cfg(feature = "office")]
        Target::Office => Ok(Box::new(DocxRenderer::new())),
        #[cfg(not(feature = "office"))]
        Target::Office => Err(Error::Unsupported(
            "DOCX output requires the 'office' feature".to_string(),
        )),
    }
}

/// Colour of a heading accent.
pub fn accent_color(accent: Accent, palette: &Palette) -> Rgb {
    match accent {
        Accent::Primary => palette.primary,
        Accent::Secondary => palette.secondary,
        Accent::Alert => palette.alert,
    }
}

/// Background and text colour of a flagged row.
pub fn flag_colors(flag: RowFlag, palette: &Palette) -> Option<(Rgb, Rgb)> {
    match flag {
        RowFlag::Normal => None,
        RowFlag::NonConforming => Some((palette.alert_background, palette.alert)),
        RowFlag::Watch => Some((palette.watch_background, palette.watch)),
    }
}

/// Image bytes in a format browsers and word processors display.
///
/// JPEG and PNG pass through; TIFF is re-encoded as PNG.
pub fn portable_image(data: &[u8]) -> Result<(ImageKind, Vec<u8>)> {
    match ImageKind::detect(data) {
        Some(kind @ (ImageKind::Jpeg | ImageKind::Png)) => Ok((kind, data.to_vec())),
        Some(ImageKind::Tiff) => {
            let decoded =
                image::load_from_memory(data).map_err(|e| Error::Image(e.to_string()))?;
            let mut out = std::io::Cursor::new(Vec::new());
            decoded
                .write_to(&mut out, image::ImageOutputFormat::Png)
                .map_err(|e| Error::Image(e.to_string()))?;
            Ok((ImageKind::Png, out.into_inner()))
        },
        None => Err(Error::Image("unrecognised image format".to_string())),
    }
}

/// Photos of a placement; empty for every other content.
pub(crate) fn placed_images(placement: &Placement) -> &[PlacedImage] {
    match &placement.content {
        PlacedContent::Images(images) => images,
        _ => &[],
    }
}

/// Baseline of line `line` of a text box whose top edge is `top` (top-down
/// page space). The glyphs are centred vertically in their line box.
pub(crate) fn baseline_offset(top: f32, line: usize, font_size: f32, line_height: f32) -> f32 {
    top + line as f32 * line_height + (line_height - font_size) / 2.0 + font_size * 0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_targets() {
        assert_eq!(renderer_for(Target::Canvas).unwrap().target(), Target::Canvas);
        assert_eq!(renderer_for(Target::Markup).unwrap().target(), Target::Markup);
        #[cfg(feature = "office")]
        assert_eq!(renderer_for(Target::Office).unwrap().target(), Target::Office);
    }

    #[test]
    fn test_flag_colors() {
        let palette = Palette::default();
        assert_eq!(flag_colors(RowFlag::Normal, &palette), None);
        assert_eq!(
            flag_colors(RowFlag::NonConforming, &palette),
            Some((palette.alert_background, palette.alert))
        );
        assert_eq!(accent_color(Accent::Alert, &palette), palette.alert);
    }

    #[test]
    fn test_portable_image_rejects_unknown() {
        assert!(portable_image(b"GIF89a....").is_err());
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];
        let (kind, bytes) = portable_image(&jpeg).unwrap();
        assert_eq!(kind, ImageKind::Jpeg);
        assert_eq!(bytes, jpeg.to_vec());
    }

    #[test]
    fn test_baseline_offset() {
        // line box 13, glyph 10: 1.5 + 8
        assert!((baseline_offset(100.0, 0, 10.0, 13.0) - 109.5).abs() < 1e-4);
        assert!((baseline_offset(100.0, 2, 10.0, 13.0) - 135.5).abs() < 1e-4);
    }
}
