//! PDF document writer.
//!
//! Assembles complete PDF documents with proper structure:
//! header, body, xref table, and trailer.
//!
//! Object numbering is fixed by insertion order (catalog, page tree, fonts,
//! images, pages, outline, info), so two runs over the same input produce the
//! same bytes.

use super::content_stream::ContentStreamBuilder;
use super::font_manager::Base14Font;
use super::image_handler::ImageData;
use super::object_serializer::ObjectSerializer;
use crate::error::Result;
use crate::object::{Dict, Object, ObjectRef};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::io::Write;

/// Configuration for PDF generation.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.7")
    pub version: String,
    /// Document title
    pub title: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    /// Whether to compress content streams
    pub compress: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: "1.7".to_string(),
            title: None,
            author: None,
            subject: None,
            creator: Some(crate::NAME.to_string()),
            compress: false,
        }
    }
}

impl PdfWriterConfig {
    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set document subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Enable or disable stream compression.
    ///
    /// When enabled, content streams are compressed with FlateDecode.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Compress data using Flate/Deflate compression.
fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// A page being built.
pub struct PageBuilder<'a> {
    writer: &'a mut PdfWriter,
    page_index: usize,
}

impl<'a> PageBuilder<'a> {
    /// Content stream of this page.
    pub fn content(&mut self) -> &mut ContentStreamBuilder {
        &mut self.writer.pages[self.page_index].content_builder
    }

    /// Paint a registered image and add it to the page resources.
    pub fn draw_image(&mut self, name: &str, x: f32, y: f32, width: f32, height: f32) -> &mut Self {
        let page = &mut self.writer.pages[self.page_index];
        page.xobjects.insert(name.to_string());
        page.content_builder.draw_image(name, x, y, width, height);
        self
    }

    /// Add a document outline entry pointing at `top` on this page.
    pub fn add_outline(&mut self, title: impl Into<String>, top: f32) -> &mut Self {
        self.writer.outlines.push(OutlineEntry {
            title: title.into(),
            page_index: self.page_index,
            top,
        });
        self
    }

    /// Index of this page in the document.
    pub fn index(&self) -> usize {
        self.page_index
    }

    /// Finish building this page and return to the writer.
    pub fn finish(self) -> &'a mut PdfWriter {
        self.writer
    }
}

/// Internal page data.
struct PageData {
    width: f32,
    height: f32,
    content_builder: ContentStreamBuilder,
    xobjects: BTreeSet<String>,
}

struct OutlineEntry {
    title: String,
    page_index: usize,
    top: f32,
}

/// PDF document writer.
///
/// Builds a complete PDF document with pages, fonts, images and a flat
/// outline.
pub struct PdfWriter {
    config: PdfWriterConfig,
    pages: Vec<PageData>,
    /// Registered images by resource name, in registration order
    images: IndexMap<String, ImageData>,
    outlines: Vec<OutlineEntry>,
}

impl PdfWriter {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(PdfWriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: PdfWriterConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            images: IndexMap::new(),
            outlines: Vec::new(),
        }
    }

    /// Add a page with the given dimensions.
    pub fn add_page(&mut self, width: f32, height: f32) -> PageBuilder<'_> {
        let page_index = self.pages.len();
        self.pages.push(PageData {
            width,
            height,
            content_builder: ContentStreamBuilder::new(),
            xobjects: BTreeSet::new(),
        });
        PageBuilder {
            writer: self,
            page_index,
        }
    }

    /// Add an A4 sized page (210mm x 297mm).
    pub fn add_a4_page(&mut self) -> PageBuilder<'_> {
        self.add_page(595.0, 842.0)
    }

    /// Register an image XObject and return its resource name (`Im1`, `Im2`, ...).
    pub fn register_image(&mut self, image: ImageData) -> String {
        let name = format!("Im{}", self.images.len() + 1);
        self.images.insert(name.clone(), image);
        name
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Build the complete PDF document.
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut objects: Vec<Object> = Vec::new();
        let alloc = |obj: Object, objects: &mut Vec<Object>| -> ObjectRef {
            objects.push(obj);
            ObjectRef::new(objects.len() as u32, 0)
        };

        // catalog and page tree are patched once their children exist
        let catalog_ref = alloc(Object::Null, &mut objects);
        let pages_ref = alloc(Object::Null, &mut objects);

        let mut font_resources = Dict::new();
        for font in Base14Font::ALL {
            let font_obj = ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Font")),
                ("Subtype", ObjectSerializer::name("Type1")),
                ("BaseFont", ObjectSerializer::name(font.base_font())),
                ("Encoding", ObjectSerializer::name("WinAnsiEncoding")),
            ]);
            let font_ref = alloc(font_obj, &mut objects);
            font_resources.insert(font.resource_name().to_string(), Object::Reference(font_ref));
        }

        let mut image_refs: IndexMap<String, ObjectRef> = IndexMap::new();
        for (name, image) in &self.images {
            let mut dict = image.build_xobject_dict();
            if let (Some(mask_dict), Some(mask)) = (image.build_soft_mask_dict(), &image.soft_mask)
            {
                let mask_ref = alloc(
                    Object::Stream {
                        dict: mask_dict,
                        data: bytes::Bytes::from(mask.clone()),
                    },
                    &mut objects,
                );
                dict.insert("SMask".to_string(), Object::Reference(mask_ref));
            }
            let image_ref = alloc(
                Object::Stream {
                    dict,
                    data: bytes::Bytes::from(image.data.clone()),
                },
                &mut objects,
            );
            image_refs.insert(name.clone(), image_ref);
        }

        let mut page_refs = Vec::with_capacity(self.pages.len());
        for page_data in &self.pages {
            let raw_content = page_data.content_builder.build();
            let mut content_dict = Dict::new();
            let content_bytes = if self.config.compress {
                match compress_data(&raw_content) {
                    Ok(compressed) => {
                        content_dict
                            .insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
                        compressed
                    },
                    Err(e) => {
                        log::warn!("content stream left uncompressed: {}", e);
                        raw_content
                    },
                }
            } else {
                raw_content
            };
            let content_ref = alloc(
                Object::Stream {
                    dict: content_dict,
                    data: bytes::Bytes::from(content_bytes),
                },
                &mut objects,
            );

            let mut resources = Dict::new();
            resources.insert("Font".to_string(), Object::Dictionary(font_resources.clone()));
            let xobjects: Dict = page_data
                .xobjects
                .iter()
                .filter_map(|name| {
                    image_refs
                        .get(name)
                        .map(|r| (name.clone(), Object::Reference(*r)))
                })
                .collect();
            if !xobjects.is_empty() {
                resources.insert("XObject".to_string(), Object::Dictionary(xobjects));
            }

            let page_obj = ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Page")),
                ("Parent", Object::Reference(pages_ref)),
                (
                    "MediaBox",
                    ObjectSerializer::rect(
                        0.0,
                        0.0,
                        page_data.width as f64,
                        page_data.height as f64,
                    ),
                ),
                ("Contents", Object::Reference(content_ref)),
                ("Resources", Object::Dictionary(resources)),
            ]);
            page_refs.push(alloc(page_obj, &mut objects));
        }

        let outline_root = self.write_outlines(&page_refs, &mut objects);

        objects[(pages_ref.id - 1) as usize] = ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Pages")),
            ("Kids", Object::Array(page_refs.iter().map(|r| Object::Reference(*r)).collect())),
            ("Count", ObjectSerializer::integer(page_refs.len() as i64)),
        ]);

        let mut catalog = vec![
            ("Type", ObjectSerializer::name("Catalog")),
            ("Pages", Object::Reference(pages_ref)),
        ];
        if let Some(root) = outline_root {
            catalog.push(("Outlines", Object::Reference(root)));
            catalog.push(("PageMode", ObjectSerializer::name("UseOutlines")));
        }
        objects[(catalog_ref.id - 1) as usize] = ObjectSerializer::dict(catalog);

        let mut info_entries = Vec::new();
        if let Some(title) = &self.config.title {
            info_entries.push(("Title", ObjectSerializer::string(title)));
        }
        if let Some(author) = &self.config.author {
            info_entries.push(("Author", ObjectSerializer::string(author)));
        }
        if let Some(subject) = &self.config.subject {
            info_entries.push(("Subject", ObjectSerializer::string(subject)));
        }
        if let Some(creator) = &self.config.creator {
            info_entries.push(("Creator", ObjectSerializer::string(creator)));
            info_entries.push(("Producer", ObjectSerializer::string(creator)));
        }
        let info_ref = alloc(ObjectSerializer::dict(info_entries), &mut objects);

        self.serialize(&objects, catalog_ref, info_ref)
    }

    fn write_outlines(
        &self,
        page_refs: &[ObjectRef],
        objects: &mut Vec<Object>,
    ) -> Option<ObjectRef> {
        if self.outlines.is_empty() {
            return None;
        }
        let root_id = objects.len() as u32 + 1;
        let first_id = root_id + 1;
        let count = self.outlines.len() as u32;

        objects.push(ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Outlines")),
            ("First", ObjectSerializer::reference(first_id, 0)),
            ("Last", ObjectSerializer::reference(first_id + count - 1, 0)),
            ("Count", ObjectSerializer::integer(count as i64)),
        ]));

        for (i, entry) in self.outlines.iter().enumerate() {
            let id = first_id + i as u32;
            let Some(page_ref) = page_refs.get(entry.page_index) else {
                objects.push(Object::Null);
                continue;
            };
            let mut item = vec![
                ("Title", ObjectSerializer::string(&entry.title)),
                ("Parent", ObjectSerializer::reference(root_id, 0)),
                (
                    "Dest",
                    ObjectSerializer::array(vec![
                        Object::Reference(*page_ref),
                        ObjectSerializer::name("XYZ"),
                        Object::Null,
                        ObjectSerializer::real(entry.top as f64),
                        Object::Null,
                    ]),
                ),
            ];
            if i > 0 {
                item.push(("Prev", ObjectSerializer::reference(id - 1, 0)));
            }
            if i + 1 < self.outlines.len() {
                item.push(("Next", ObjectSerializer::reference(id + 1, 0)));
            }
            objects.push(ObjectSerializer::dict(item));
        }

        Some(ObjectRef::new(root_id, 0))
    }

    fn serialize(
        &self,
        objects: &[Object],
        catalog_ref: ObjectRef,
        info_ref: ObjectRef,
    ) -> Result<Vec<u8>> {
        let serializer = ObjectSerializer::compact();
        let mut output = Vec::new();
        let mut offsets = Vec::with_capacity(objects.len());

        writeln!(output, "%PDF-{}", self.config.version)?;
        // binary marker
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        for (i, obj) in objects.iter().enumerate() {
            offsets.push(output.len());
            output.extend_from_slice(&serializer.serialize_indirect(i as u32 + 1, 0, obj));
        }

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", objects.len() + 1)?;
        writeln!(output, "0000000000 65535 f ")?;
        for offset in &offsets {
            writeln!(output, "{:010} 00000 n ", offset)?;
        }

        let trailer = ObjectSerializer::dict(vec![
            ("Size", ObjectSerializer::integer(objects.len() as i64 + 1)),
            ("Root", Object::Reference(catalog_ref)),
            ("Info", Object::Reference(info_ref)),
        ]);

        writeln!(output, "trailer")?;
        output.extend_from_slice(&serializer.serialize(&trailer));
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        Ok(output)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::image_handler::{ColorSpace, ImageFormat};

    fn text_of(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_create_empty_pdf() {
        let mut writer = PdfWriter::new();
        writer.add_a4_page().finish();
        let content = text_of(&writer.finish().unwrap());

        assert!(content.starts_with("%PDF-1.7"));
        assert!(content.contains("/Type /Catalog"));
        assert!(content.contains("/Type /Pages"));
        assert!(content.contains("/Type /Page"));
        assert!(content.contains("[0 0 595 842]"));
        assert!(content.ends_with("%%EOF"));
    }

    #[test]
    fn test_fonts_are_win_ansi_base14() {
        let mut writer = PdfWriter::new();
        {
            let mut page = writer.add_a4_page();
            page.content().text("HelveticaBold", 12.0, 72.0, 720.0, "Bilan");
            page.finish();
        }
        let content = text_of(&writer.finish().unwrap());

        assert!(content.contains("/BaseFont /Helvetica-Bold"));
        assert!(content.contains("/Encoding /WinAnsiEncoding"));
        assert!(content.contains("/HelveticaBold 4 0 R"));
        assert!(content.contains("(Bilan) Tj"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut writer = PdfWriter::new();
        writer.add_a4_page().finish();
        writer.add_a4_page().finish();
        let bytes = writer.finish().unwrap();
        let content = text_of(&bytes);

        let xref = content.find("\nxref\n").unwrap() + 1;
        let entries: Vec<usize> = content[xref..]
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        for (i, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", i + 1);
            assert!(bytes[*offset..].starts_with(expected.as_bytes()));
        }
        assert!(content.contains("/Count 2"));
    }

    #[test]
    fn test_image_resources_only_on_using_page() {
        let mut writer = PdfWriter::new();
        let name = writer.register_image(ImageData {
            width: 2,
            height: 1,
            bits_per_component: 8,
            color_space: ColorSpace::DeviceRGB,
            format: ImageFormat::Jpeg,
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
            soft_mask: None,
        });
        assert_eq!(name, "Im1");
        writer.add_a4_page().finish();
        writer.add_a4_page().draw_image(&name, 10.0, 10.0, 100.0, 50.0);
        let content = text_of(&writer.finish().unwrap());

        assert_eq!(content.matches("/XObject <</Im1").count(), 1);
        assert!(content.contains("/Subtype /Image"));
        assert!(content.contains("/Im1 Do"));
    }

    #[test]
    fn test_outline_and_metadata() {
        let mut writer = PdfWriter::with_config(
            PdfWriterConfig::default().with_title("Rapport").with_author("Aqua"),
        );
        writer.add_a4_page().add_outline("Bilan", 700.0);
        let content = text_of(&writer.finish().unwrap());

        assert!(content.contains("/Type /Outlines"));
        assert!(content.contains("/Title (Bilan)"));
        assert!(content.contains("/PageMode /UseOutlines"));
        assert!(content.contains("/Title (Rapport)"));
        assert!(content.contains("/Author (Aqua)"));
    }

    #[test]
    fn test_compressed_stream_and_determinism() {
        let build = || {
            let mut writer = PdfWriter::with_config(PdfWriterConfig::default().with_compress(true));
            writer.add_a4_page().content().rect(0.0, 0.0, 10.0, 10.0).fill();
            writer.finish().unwrap()
        };
        let first = build();
        assert!(text_of(&first).contains("/Filter /FlateDecode"));
        assert_eq!(first, build());
    }
}
