//! OPC packaging: XML part writer, relationships and the zip container.

use crate::error::Result;
use crate::model::ImageKind;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub(crate) const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const NS_R: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const NS_WP: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(crate) const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Streaming writer for one XML part.
pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Writer with the XML declaration already emitted.
    pub(crate) fn new() -> Result<Self> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    pub(crate) fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    pub(crate) fn close(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(start))?;
        Ok(())
    }

    /// Escaped character data.
    pub(crate) fn text(&mut self, text: &str) -> Result<()> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Element holding only text.
    pub(crate) fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.open(name, attrs)?;
        self.text(text)?;
        self.close(name)
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// An image stored under `word/media/`.
#[derive(Debug, Clone)]
pub(crate) struct MediaPart {
    /// File name inside `word/media/`
    pub(crate) file_name: String,
    /// Relationship id used by every part that references it
    pub(crate) rel_id: String,
    pub(crate) kind: ImageKind,
    pub(crate) data: Vec<u8>,
}

/// Relationships of one part.
#[derive(Debug, Default)]
pub(crate) struct Relationships {
    entries: Vec<(String, String, String)>,
}

impl Relationships {
    /// Office relationship such as `styles` or `image`.
    pub(crate) fn add(&mut self, id: impl Into<String>, kind: &str, target: impl Into<String>) {
        self.add_typed(id, format!("{}/{}", REL_BASE, kind), target);
    }

    /// Relationship with a full type URI.
    pub(crate) fn add_typed(
        &mut self,
        id: impl Into<String>,
        kind: impl Into<String>,
        target: impl Into<String>,
    ) {
        self.entries.push((id.into(), kind.into(), target.into()));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        );
        for (id, kind, target) in &self.entries {
            xml.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>",
                id,
                kind,
                escape(target.as_str())
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Document properties written to `docProps/core.xml`.
#[derive(Debug, Clone)]
pub(crate) struct CoreProperties {
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) creator: String,
    /// W3CDTF timestamp used for creation and modification
    pub(crate) timestamp: String,
}

impl CoreProperties {
    pub(crate) fn to_xml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
             xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
             <dc:title>{}</dc:title><dc:subject>{}</dc:subject><dc:creator>{}</dc:creator>\
             <cp:lastModifiedBy>{}</cp:lastModifiedBy>\
             <dcterms:created xsi:type=\"dcterms:W3CDTF\">{ts}</dcterms:created>\
             <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{ts}</dcterms:modified>\
             </cp:coreProperties>",
            escape(self.title.as_str()),
            escape(self.subject.as_str()),
            escape(self.creator.as_str()),
            escape(self.creator.as_str()),
            ts = escape(self.timestamp.as_str())
        )
    }
}

fn app_xml() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\">\
         <Application>{} {}</Application></Properties>",
        crate::NAME,
        crate::VERSION
    )
}

/// All parts of a WordprocessingML package.
pub(crate) struct Package {
    pub(crate) document: Vec<u8>,
    pub(crate) document_rels: Relationships,
    pub(crate) styles: String,
    pub(crate) numbering: String,
    pub(crate) header: Vec<u8>,
    pub(crate) header_rels: Relationships,
    pub(crate) footer: Vec<u8>,
    pub(crate) footer_rels: Relationships,
    pub(crate) media: Vec<MediaPart>,
    pub(crate) core: CoreProperties,
}

impl Package {
    fn content_types(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        );
        let mut kinds: Vec<ImageKind> = Vec::new();
        for part in &self.media {
            if !kinds.contains(&part.kind) {
                kinds.push(part.kind);
            }
        }
        for kind in kinds {
            xml.push_str(&format!(
                "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                kind.extension(),
                kind.media_type()
            ));
        }
        let wml = "application/vnd.openxmlformats-officedocument.wordprocessingml";
        for (part, content_type) in [
            ("/word/document.xml", format!("{}.document.main+xml", wml)),
            ("/word/styles.xml", format!("{}.styles+xml", wml)),
            ("/word/numbering.xml", format!("{}.numbering+xml", wml)),
            ("/word/header1.xml", format!("{}.header+xml", wml)),
            ("/word/footer1.xml", format!("{}.footer+xml", wml)),
            (
                "/docProps/core.xml",
                "application/vnd.openxmlformats-package.core-properties+xml".to_string(),
            ),
            (
                "/docProps/app.xml",
                "application/vnd.openxmlformats-officedocument.extended-properties+xml".to_string(),
            ),
        ] {
            xml.push_str(&format!(
                "<Override PartName=\"{}\" ContentType=\"{}\"/>",
                part, content_type
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn package_rels() -> String {
        let mut rels = Relationships::default();
        rels.add("rId1", "officeDocument", "word/document.xml");
        rels.add_typed(
            "rId2",
            "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
            "docProps/core.xml",
        );
        rels.add("rId3", "extended-properties", "docProps/app.xml");
        rels.to_xml()
    }

    /// Zip the package. Entry order and timestamps are fixed.
    pub(crate) fn write(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        let mut entries: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), self.content_types().into_bytes()),
            ("_rels/.rels".to_string(), Self::package_rels().into_bytes()),
            ("docProps/core.xml".to_string(), self.core.to_xml().into_bytes()),
            ("docProps/app.xml".to_string(), app_xml().into_bytes()),
            ("word/document.xml".to_string(), self.document.clone()),
            ("word/styles.xml".to_string(), self.styles.clone().into_bytes()),
            ("word/numbering.xml".to_string(), self.numbering.clone().into_bytes()),
            ("word/header1.xml".to_string(), self.header.clone()),
            ("word/footer1.xml".to_string(), self.footer.clone()),
            (
                "word/_rels/document.xml.rels".to_string(),
                self.document_rels.to_xml().into_bytes(),
            ),
        ];
        if !self.header_rels.is_empty() {
            entries.push((
                "word/_rels/header1.xml.rels".to_string(),
                self.header_rels.to_xml().into_bytes(),
            ));
        }
        if !self.footer_rels.is_empty() {
            entries.push((
                "word/_rels/footer1.xml.rels".to_string(),
                self.footer_rels.to_xml().into_bytes(),
            ));
        }

        for (name, data) in &entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }
        for part in &self.media {
            zip.start_file(format!("word/media/{}", part.file_name), options)?;
            zip.write_all(&part.data)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}
