//! Image handling for PDF generation.
//!
//! Per PDF spec Section 8.9, images are represented as XObjects.
//!
//! # Supported Formats
//!
//! - **JPEG**: Pass-through embedding using DCTDecode filter
//! - **PNG / TIFF**: Decoded to raw samples and re-compressed with FlateDecode;
//!   an alpha channel becomes a soft mask

use std::io::Write;

use crate::model::ImageKind;
use crate::object::{Dict, Object};

/// Encoding of the embedded sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG stream (DCTDecode filter)
    Jpeg,
    /// Zlib-compressed raw samples (FlateDecode filter)
    Flate,
}

/// Color space for image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Grayscale (1 component per pixel)
    DeviceGray,
    /// RGB color (3 components per pixel)
    DeviceRGB,
    /// CMYK color (4 components per pixel)
    DeviceCMYK,
}

impl ColorSpace {
    /// Get the number of color components.
    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceGray => 1,
            ColorSpace::DeviceRGB => 3,
            ColorSpace::DeviceCMYK => 4,
        }
    }

    /// Get the PDF name for this color space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
        }
    }
}

/// Image data for PDF embedding.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Bits per component (usually 8)
    pub bits_per_component: u8,
    /// Color space
    pub color_space: ColorSpace,
    /// Encoding of `data`
    pub format: ImageFormat,
    /// Encoded image data
    pub data: Vec<u8>,
    /// Optional compressed soft mask (alpha channel)
    pub soft_mask: Option<Vec<u8>>,
}

impl ImageData {
    /// Load a JPEG image; the bytes are embedded without transcoding.
    pub fn from_jpeg(data: Vec<u8>) -> Result<Self, ImageError> {
        let (width, height, color_space) = parse_jpeg_header(&data)?;

        Ok(Self {
            width,
            height,
            bits_per_component: 8,
            color_space,
            format: ImageFormat::Jpeg,
            data,
            soft_mask: None,
        })
    }

    /// Decode a PNG or TIFF image and re-encode its samples with Flate.
    pub fn from_decoded(data: &[u8]) -> Result<Self, ImageError> {
        use image::GenericImageView;

        let img =
            image::load_from_memory(data).map_err(|e| ImageError::DecodeError(e.to_string()))?;
        let (width, height) = img.dimensions();

        let (color_space, pixels, alpha) = match img.color() {
            image::ColorType::L8 | image::ColorType::L16 => {
                (ColorSpace::DeviceGray, img.to_luma8().into_raw(), None)
            },
            image::ColorType::La8 | image::ColorType::La16 => {
                let la = img.to_luma_alpha8();
                let mut gray = Vec::with_capacity((width * height) as usize);
                let mut alpha_channel = Vec::with_capacity((width * height) as usize);
                for pixel in la.pixels() {
                    gray.push(pixel.0[0]);
                    alpha_channel.push(pixel.0[1]);
                }
                (ColorSpace::DeviceGray, gray, Some(alpha_channel))
            },
            image::ColorType::Rgba8 | image::ColorType::Rgba16 | image::ColorType::Rgba32F => {
                let rgba = img.to_rgba8();
                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                let mut alpha_channel = Vec::with_capacity((width * height) as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha_channel.push(pixel.0[3]);
                }
                (ColorSpace::DeviceRGB, rgb, Some(alpha_channel))
            },
            _ => (ColorSpace::DeviceRGB, img.to_rgb8().into_raw(), None),
        };

        // fully opaque masks are dropped
        let alpha = alpha.filter(|a| a.iter().any(|&v| v != 0xFF));

        Ok(Self {
            width,
            height,
            bits_per_component: 8,
            color_space,
            format: ImageFormat::Flate,
            data: compress_image_data(&pixels)?,
            soft_mask: alpha.map(|a| compress_image_data(&a)).transpose()?,
        })
    }

    /// Load an image from raw bytes, auto-detecting format.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ImageError> {
        match ImageKind::detect(data) {
            Some(ImageKind::Jpeg) => Self::from_jpeg(data.to_vec()),
            Some(ImageKind::Png) | Some(ImageKind::Tiff) => Self::from_decoded(data),
            None => Err(ImageError::UnsupportedFormat),
        }
    }

    /// Build the PDF Image XObject dictionary.
    pub fn build_xobject_dict(&self) -> Dict {
        let mut dict = Dict::new();

        dict.insert("Type".to_string(), Object::Name("XObject".to_string()));
        dict.insert("Subtype".to_string(), Object::Name("Image".to_string()));
        dict.insert("Width".to_string(), Object::Integer(self.width as i64));
        dict.insert("Height".to_string(), Object::Integer(self.height as i64));
        dict.insert(
            "ColorSpace".to_string(),
            Object::Name(self.color_space.pdf_name().to_string()),
        );
        dict.insert(
            "BitsPerComponent".to_string(),
            Object::Integer(self.bits_per_component as i64),
        );

        let filter = match self.format {
            ImageFormat::Jpeg => "DCTDecode",
            ImageFormat::Flate => "FlateDecode",
        };
        dict.insert("Filter".to_string(), Object::Name(filter.to_string()));
        dict.insert("Length".to_string(), Object::Integer(self.data.len() as i64));

        dict
    }

    /// Build the soft mask (alpha channel) XObject dictionary.
    pub fn build_soft_mask_dict(&self) -> Option<Dict> {
        self.soft_mask.as_ref().map(|mask_data| {
            let mut dict = Dict::new();
            dict.insert("Type".to_string(), Object::Name("XObject".to_string()));
            dict.insert("Subtype".to_string(), Object::Name("Image".to_string()));
            dict.insert("Width".to_string(), Object::Integer(self.width as i64));
            dict.insert("Height".to_string(), Object::Integer(self.height as i64));
            dict.insert("ColorSpace".to_string(), Object::Name("DeviceGray".to_string()));
            dict.insert("BitsPerComponent".to_string(), Object::Integer(8));
            dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
            dict.insert("Length".to_string(), Object::Integer(mask_data.len() as i64));
            dict
        })
    }

    /// Get the aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Image embedding error.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Unsupported image format
    #[error("Unsupported image format")]
    UnsupportedFormat,

    /// Failed to decode image
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// Failed to compress image data
    #[error("Compression error: {0}")]
    CompressionError(String),

    /// Invalid image data
    #[error("Invalid image data: {0}")]
    InvalidData(String),
}

impl From<ImageError> for crate::error::Error {
    fn from(err: ImageError) -> Self {
        crate::error::Error::Image(err.to_string())
    }
}

/// Parse JPEG header to extract dimensions and color space.
pub(crate) fn parse_jpeg_header(data: &[u8]) -> Result<(u32, u32, ColorSpace), ImageError> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(ImageError::InvalidData("Not a valid JPEG".to_string()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = data[pos + 1];
        pos += 2;

        // fill bytes and stuffed zeros
        if marker == 0xFF || marker == 0x00 {
            continue;
        }

        // SOF markers (Start of Frame)
        if matches!(
            marker,
            0xC0 | 0xC1
                | 0xC2
                | 0xC3
                | 0xC5
                | 0xC6
                | 0xC7
                | 0xC9
                | 0xCA
                | 0xCB
                | 0xCD
                | 0xCE
                | 0xCF
        ) {
            if pos + 8 > data.len() {
                return Err(ImageError::InvalidData("Truncated JPEG header".to_string()));
            }

            let height = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as u32;
            let width = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
            let color_space = match data[pos + 7] {
                1 => ColorSpace::DeviceGray,
                4 => ColorSpace::DeviceCMYK,
                _ => ColorSpace::DeviceRGB,
            };

            return Ok((width, height, color_space));
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        pos += length;
    }

    Err(ImageError::InvalidData("Could not find JPEG dimensions".to_string()))
}

/// Compress image data using Flate.
fn compress_image_data(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ImageError::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ImageError::CompressionError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_jpeg_header(width: u16, height: u16, components: u8) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        // APP0 segment to skip
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.push(components);
        data.extend_from_slice(&[0x01, 0x11, 0x00, 0xFF, 0xD9]);
        data
    }

    fn encode(img: image::DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_parse_jpeg_header() {
        let data = minimal_jpeg_header(640, 480, 3);
        let (w, h, cs) = parse_jpeg_header(&data).unwrap();
        assert_eq!((w, h), (640, 480));
        assert_eq!(cs, ColorSpace::DeviceRGB);

        let gray = minimal_jpeg_header(10, 20, 1);
        assert_eq!(parse_jpeg_header(&gray).unwrap().2, ColorSpace::DeviceGray);
    }

    #[test]
    fn test_parse_jpeg_rejects_garbage() {
        assert!(parse_jpeg_header(b"").is_err());
        assert!(parse_jpeg_header(&[0xFF, 0xD8, 0xFF]).is_err());
    }

    #[test]
    fn test_jpeg_passthrough_dict() {
        let data = minimal_jpeg_header(64, 32, 3);
        let img = ImageData::from_bytes(&data).unwrap();
        assert_eq!(img.data, data);
        let dict = img.build_xobject_dict();
        assert_eq!(dict.get("Filter"), Some(&Object::Name("DCTDecode".to_string())));
        assert!(!dict.contains_key("DecodeParms"));
    }

    #[test]
    fn test_png_is_flate_without_predictor() {
        let png = encode(image::DynamicImage::ImageRgb8(image::RgbImage::new(3, 2)));
        let img = ImageData::from_bytes(&png).unwrap();
        assert_eq!(img.format, ImageFormat::Flate);
        assert_eq!(img.color_space, ColorSpace::DeviceRGB);
        assert!(img.soft_mask.is_none());

        let dict = img.build_xobject_dict();
        assert_eq!(dict.get("Filter"), Some(&Object::Name("FlateDecode".to_string())));
        assert!(!dict.contains_key("DecodeParms"));
    }

    #[test]
    fn test_png_alpha_becomes_soft_mask() {
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 128]));
        let img = ImageData::from_bytes(&encode(image::DynamicImage::ImageRgba8(rgba))).unwrap();
        assert!(img.soft_mask.is_some());
        assert!(img.build_soft_mask_dict().is_some());
    }

    #[test]
    fn test_unsupported_format() {
        assert!(matches!(
            ImageData::from_bytes(b"GIF89a"),
            Err(ImageError::UnsupportedFormat)
        ));
    }
}
