//! Analysed photographs and per-run image metadata.

use crate::error::{Error, Result};
use crate::writer::parse_jpeg_header;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;

/// One analysed photograph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRecord {
    /// Encoded image bytes (base64 in JSON, `data:` prefix accepted)
    #[serde(with = "base64_payload")]
    pub data: Vec<u8>,
    /// Declared media type
    pub media_type: String,
    /// Free-text description from the vision collaborator
    pub description: String,
    /// Coarse category tag
    pub category: String,
    /// Lower values are shown first within a bucket
    pub display_priority: i32,
    /// Quality tag
    pub quality: String,
}

impl ImageRecord {
    /// Record with a payload and media type.
    pub fn new(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            data,
            media_type: media_type.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the category tag.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the display priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.display_priority = priority;
        self
    }

    /// Set the quality tag.
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Parse a JSON array of records.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

mod base64_payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let payload = match encoded.split_once(";base64,") {
            Some((_, rest)) => rest,
            None => encoded.as_str(),
        };
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(compact).map_err(serde::de::Error::custom)
    }
}

/// Index of an image in the input slice of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId(pub usize);

impl ImageId {
    /// Position in the input slice.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Encoded format detected from the payload's magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// JPEG / JFIF
    Jpeg,
    /// PNG
    Png,
    /// TIFF (little or big endian)
    Tiff,
}

impl ImageKind {
    /// Sniff the format.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8]) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
            Some(ImageKind::Tiff)
        } else {
            None
        }
    }

    /// IANA media type.
    pub fn media_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Tiff => "image/tiff",
        }
    }

    /// File extension used inside packages.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
            ImageKind::Tiff => "tiff",
        }
    }
}

/// Pixel dimensions and format of a decodable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoded format
    pub kind: ImageKind,
}

impl ImageInfo {
    /// Width over height.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Read dimensions without decoding pixel data.
pub fn probe(data: &[u8]) -> std::result::Result<ImageInfo, String> {
    let kind = ImageKind::detect(data).ok_or_else(|| "unrecognised image format".to_string())?;
    let (width, height) = match kind {
        ImageKind::Jpeg => {
            let (w, h, _) = parse_jpeg_header(data).map_err(|e| e.to_string())?;
            (w, h)
        },
        ImageKind::Png | ImageKind::Tiff => image::io::Reader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .into_dimensions()
            .map_err(|e| e.to_string())?,
    };
    if width == 0 || height == 0 {
        return Err(format!("degenerate dimensions {}x{}", width, height));
    }
    Ok(ImageInfo {
        width,
        height,
        kind,
    })
}

/// Dimensions of every image placed in the document, probed once per run.
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    entries: BTreeMap<ImageId, ImageInfo>,
}

impl ImageCatalog {
    /// Probe the given images; the first undecodable one aborts the run.
    pub fn probe(images: &[ImageRecord], ids: impl IntoIterator<Item = ImageId>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for id in ids {
            if entries.contains_key(&id) {
                continue;
            }
            let record = images.get(id.index()).ok_or_else(|| Error::UndecodableImage {
                index: id.index(),
                reason: "no such image".to_string(),
            })?;
            let info = probe(&record.data).map_err(|reason| Error::UndecodableImage {
                index: id.index(),
                reason,
            })?;
            entries.insert(id, info);
        }
        log::debug!("Probed {} placed images", entries.len());
        Ok(Self { entries })
    }

    /// Catalog from already known dimensions.
    pub fn from_entries(entries: BTreeMap<ImageId, ImageInfo>) -> Self {
        Self { entries }
    }

    /// Metadata for a placed image.
    pub fn get(&self, id: ImageId) -> Option<&ImageInfo> {
        self.entries.get(&id)
    }

    /// Metadata for a placed image, as an error when it was never probed.
    pub fn require(&self, id: ImageId) -> Result<&ImageInfo> {
        self.get(id)
            .ok_or_else(|| Error::Layout(format!("image {} was not probed", id)))
    }

    /// Number of probed images.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no image is placed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(ImageKind::detect(&[0xFF, 0xD8, 0xFF]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::detect(&png(1, 1)), Some(ImageKind::Png));
        assert_eq!(ImageKind::detect(b"II*\0rest"), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::detect(b"GIF89a"), None);
    }

    #[test]
    fn test_probe_png() {
        let info = probe(&png(40, 20)).unwrap();
        assert_eq!((info.width, info.height), (40, 20));
        assert_eq!(info.kind, ImageKind::Png);
        assert!((info.aspect_ratio() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_catalog_rejects_undecodable() {
        let images = vec![
            ImageRecord::new(png(4, 4), "image/png"),
            ImageRecord::new(b"not an image".to_vec(), "image/jpeg"),
        ];
        let catalog = ImageCatalog::probe(&images, [ImageId(0)]).unwrap();
        assert_eq!(catalog.len(), 1);

        let err = ImageCatalog::probe(&images, [ImageId(0), ImageId(1)]).unwrap_err();
        assert!(matches!(err, Error::UndecodableImage { index: 1, .. }));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_record_json_base64() {
        let json = r#"[{"data": "data:image/png;base64,AAEC", "description": "Skimmer",
                        "display_priority": 2}]"#;
        let records = ImageRecord::list_from_json(json).unwrap();
        assert_eq!(records[0].data, vec![0, 1, 2]);
        assert_eq!(records[0].display_priority, 2);
        assert!(records[0].quality.is_empty());

        let back = serde_json::to_string(&records[0]).unwrap();
        assert!(back.contains("\"AAEC\""));
    }
}
