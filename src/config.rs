//! Configuration for report composition.
//!
//! A single [`ComposeConfig`] is passed explicitly to every renderer. Colours,
//! font sizes and corner radii live here so the three output formats cannot drift
//! apart.

use crate::error::{Error, Result};
use crate::geometry::PageGeometry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self(r, g, b))
    }

    /// Upper-case hex without `#`, as used by OOXML attributes.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// CSS notation.
    pub fn css(&self) -> String {
        format!("#{}", self.hex().to_lowercase())
    }

    /// Components in the 0.0-1.0 range used by PDF colour operators.
    pub fn to_pdf(&self) -> (f32, f32, f32) {
        (self.0 as f32 / 255.0, self.1 as f32 / 255.0, self.2 as f32 / 255.0)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Rgb::from_hex(&value).ok_or_else(|| format!("invalid colour '{}'", value))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.css()
    }
}

/// Colour tokens shared by every renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Section titles and header band
    pub primary: Rgb,
    /// Subtitles and secondary accents
    pub secondary: Rgb,
    /// Non-conforming rows and alert titles
    pub alert: Rgb,
    /// Background of non-conforming rows
    pub alert_background: Rgb,
    /// "To watch" rows
    pub watch: Rgb,
    /// Background of "to watch" rows
    pub watch_background: Rgb,
    /// Body text
    pub text: Rgb,
    /// Captions, footer text
    pub muted: Rgb,
    /// Table header background
    pub table_header_background: Rgb,
    /// Table header text
    pub table_header_text: Rgb,
    /// Table borders
    pub border: Rgb,
    /// Corner radius of title bands and image frames, in points
    pub corner_radius: f32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Rgb(0x0B, 0x53, 0x94),
            secondary: Rgb(0x1C, 0x9B, 0xC9),
            alert: Rgb(0xC6, 0x28, 0x28),
            alert_background: Rgb(0xFD, 0xEC, 0xEA),
            watch: Rgb(0xB2, 0x6A, 0x00),
            watch_background: Rgb(0xFF, 0xF4, 0xE0),
            text: Rgb(0x22, 0x22, 0x22),
            muted: Rgb(0x6B, 0x72, 0x80),
            table_header_background: Rgb(0xE3, 0xF0, 0xFA),
            table_header_text: Rgb(0x0B, 0x53, 0x94),
            border: Rgb(0xC8, 0xD3, 0xDC),
            corner_radius: 4.0,
        }
    }
}

/// Font sizes (points) and line spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    /// Cover page title
    pub cover_title_size: f32,
    /// Section titles
    pub title_size: f32,
    /// Subtitles
    pub subtitle_size: f32,
    /// Paragraphs and bullets
    pub body_size: f32,
    /// Table cells
    pub table_size: f32,
    /// Image captions
    pub caption_size: f32,
    /// Header and footer text
    pub header_footer_size: f32,
    /// Line height as a multiple of the font size
    pub line_spacing: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            cover_title_size: 24.0,
            title_size: 14.0,
            subtitle_size: 11.5,
            body_size: 10.0,
            table_size: 9.5,
            caption_size: 8.0,
            header_footer_size: 8.0,
            line_spacing: 1.3,
        }
    }
}

impl Typography {
    /// Line height for a font size.
    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_spacing
    }
}

/// Company identity used by text fallbacks and document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    /// Company name
    pub company_name: String,
    /// Report title
    pub report_title: String,
    /// Closing page text when no closing asset is available
    pub closing_text: String,
    /// Contact line shown on the closing page
    pub contact: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            company_name: "Inspection Piscine".to_string(),
            report_title: "Rapport d'inspection".to_string(),
            closing_text: "Merci de votre confiance.".to_string(),
            contact: String::new(),
        }
    }
}

/// PDF-specific output options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    /// Compress content streams with FlateDecode
    pub compress: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self { compress: true }
    }
}

/// DOCX-specific output options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeOptions {
    /// Fixed `dcterms:created`/`dcterms:modified` value (RFC 3339).
    ///
    /// When `None` the current time is used; this is the only non-deterministic
    /// field of the DOCX output.
    pub timestamp: Option<String>,
}

/// Complete composition configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Page geometry shared by all targets
    pub geometry: PageGeometry,
    /// Colour tokens
    pub palette: Palette,
    /// Font sizes
    pub typography: Typography,
    /// Company identity
    pub branding: Branding,
    /// Emit a cover page
    pub cover_page: bool,
    /// Emit a closing page
    pub closing_page: bool,
    /// Maximum height of a full-width photo, in points
    pub single_image_max_height: f32,
    /// Maximum height of a photo in a side-by-side pair, in points
    pub paired_image_max_height: f32,
    /// PDF options
    pub pdf: PdfOptions,
    /// DOCX options
    pub office: OfficeOptions,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            geometry: PageGeometry::a4(),
            palette: Palette::default(),
            typography: Typography::default(),
            branding: Branding::default(),
            cover_page: true,
            closing_page: true,
            single_image_max_height: 300.0,
            paired_image_max_height: 220.0,
            pdf: PdfOptions::default(),
            office: OfficeOptions::default(),
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject geometries that leave no room for content.
    pub fn validate(&self) -> Result<()> {
        if self.geometry.body_height() <= 0.0 || self.geometry.content_width() <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "page geometry leaves no body area ({}x{} pt)",
                self.geometry.content_width(),
                self.geometry.body_height()
            )));
        }
        Ok(())
    }

    /// Set the page geometry.
    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the colour palette.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Set the branding.
    pub fn with_branding(mut self, branding: Branding) -> Self {
        self.branding = branding;
        self
    }

    /// Enable or disable the cover and closing pages.
    pub fn with_cover_pages(mut self, cover: bool, closing: bool) -> Self {
        self.cover_page = cover;
        self.closing_page = closing;
        self
    }

    /// Enable or disable PDF stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.pdf.compress = compress;
        self
    }

    /// Pin the DOCX timestamp.
    pub fn with_office_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.office.timestamp = Some(timestamp.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_hex_roundtrip() {
        let c = Rgb::from_hex("#0b5394").unwrap();
        assert_eq!(c, Rgb(0x0B, 0x53, 0x94));
        assert_eq!(c.hex(), "0B5394");
        assert_eq!(c.css(), "#0b5394");
        assert!(Rgb::from_hex("#12345").is_none());
        assert!(Rgb::from_hex("zzzzzz").is_none());
    }

    #[test]
    fn test_rgb_to_pdf() {
        let (r, g, b) = Rgb(255, 0, 51).to_pdf();
        assert!((r - 1.0).abs() < 1e-6);
        assert_eq!(g, 0.0);
        assert!((b - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_config_defaults() {
        let config = ComposeConfig::default();
        assert!(config.cover_page);
        assert!(config.closing_page);
        assert!(config.pdf.compress);
        assert!(config.office.timestamp.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config =
            ComposeConfig::from_json(r##"{"palette": {"primary": "#112233"}, "cover_page": false}"##)
                .unwrap();
        assert_eq!(config.palette.primary, Rgb(0x11, 0x22, 0x33));
        assert_eq!(config.palette.alert, Palette::default().alert);
        assert!(!config.cover_page);
        assert!(config.closing_page);
    }

    #[test]
    fn test_config_rejects_bad_colour() {
        let result = ComposeConfig::from_json(r#"{"palette": {"primary": "blue"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_degenerate_geometry() {
        let mut geometry = PageGeometry::a4();
        geometry.header_reserved = 500.0;
        geometry.footer_reserved = 400.0;
        let config = ComposeConfig::new().with_geometry(geometry);
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_builder_methods() {
        let config = ComposeConfig::new()
            .with_cover_pages(false, false)
            .with_compress(false)
            .with_office_timestamp("2024-01-01T00:00:00Z");
        assert!(!config.cover_page);
        assert!(!config.closing_page);
        assert!(!config.pdf.compress);
        assert_eq!(config.office.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
    }
}
