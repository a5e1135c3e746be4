//! Renderer outputs: files on disk, package structure and branding assets.

mod common;

use common::{full_photos, full_report, minimal_report, png};
use quick_xml::events::Event;
use quick_xml::Reader;
use report_oxide::assets::{AssetName, DirectoryAssets, MemoryAssets};
use report_oxide::classify::classify;
use report_oxide::sections::{build, section_order};
use report_oxide::{ComposeConfig, ComposeOutput, Composer, Diagnostic, ImageRecord, Target};
use std::collections::BTreeSet;
use std::io::{Cursor, Read};

fn compose_all(composer: &Composer, images: &[ImageRecord]) -> ComposeOutput {
    let output = composer
        .compose(&full_report(), images, &Target::all())
        .unwrap();
    assert!(output.is_complete(), "failures: {:?}", output.failures);
    output
}

fn docx_entry(docx: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn bookmark_names(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() != b"w:bookmarkStart" {
                    continue;
                }
                for attr in e.attributes() {
                    let attr = attr.unwrap();
                    if attr.key.as_ref() == b"w:name" {
                        names.push(String::from_utf8(attr.value.into_owned()).unwrap());
                    }
                }
            },
            Err(e) => panic!("malformed XML at {}: {}", reader.buffer_position(), e),
            _ => {},
        }
    }
    names
}

#[test]
fn test_outputs_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let output = compose_all(&Composer::default(), &full_photos());

    for (target, bytes) in &output.outputs {
        let path = dir.path().join(format!("rapport.{}", target.extension()));
        std::fs::write(&path, bytes).unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), bytes.len());
    }

    let pdf = std::fs::read(dir.path().join("rapport.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(String::from_utf8_lossy(&pdf).trim_end().ends_with("%%EOF"));

    let docx = std::fs::read(dir.path().join("rapport.docx")).unwrap();
    assert!(docx.starts_with(b"PK"));

    let html = std::fs::read_to_string(dir.path().join("rapport.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
}

#[test]
fn test_docx_parts_are_well_formed() {
    let images = full_photos();
    let output = compose_all(&Composer::default(), &images);
    let docx = output.output(Target::Office).unwrap();

    for part in [
        "word/document.xml",
        "word/styles.xml",
        "word/numbering.xml",
        "word/header1.xml",
        "word/footer1.xml",
        "[Content_Types].xml",
        "word/_rels/document.xml.rels",
    ] {
        // bookmark_names walks the whole part and panics on malformed XML
        bookmark_names(&docx_entry(docx, part));
    }

    let expected: Vec<String> = section_order(&build(&full_report(), &images, &classify(&images)))
        .into_iter()
        .map(|s| format!("section-{}", s.key()))
        .collect();
    assert_eq!(bookmark_names(&docx_entry(docx, "word/document.xml")), expected);
}

#[test]
fn test_docx_embeds_every_placed_photo() {
    let images = full_photos();
    let output = compose_all(&Composer::default(), &images);
    let docx = output.output(Target::Office).unwrap();

    let archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let media = archive
        .file_names()
        .filter(|n| n.starts_with("word/media/"))
        .count();
    assert_eq!(media, images.len());
    assert_eq!(
        docx_entry(docx, "word/document.xml").matches("<w:drawing>").count(),
        images.len()
    );
}

#[test]
fn test_assets_replace_text_fallbacks() {
    let assets = MemoryAssets::new()
        .with(AssetName::Cover, png(1, 60, 85))
        .with(AssetName::Header, png(2, 200, 30))
        .with(AssetName::Footer, png(3, 200, 20))
        .with(AssetName::Closing, png(4, 60, 85));
    let composer = Composer::new(ComposeConfig::new().with_compress(false)).with_assets(assets);
    let output = compose_all(&composer, &[]);
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

    let pdf = String::from_utf8_lossy(output.output(Target::Canvas).unwrap()).into_owned();
    assert!(pdf.contains("/XObject"));
    assert!(!pdf.contains("(Merci de votre confiance.)"));

    let docx = output.output(Target::Office).unwrap();
    assert!(docx_entry(docx, "word/header1.xml").contains("<w:drawing>"));
    assert!(docx_entry(docx, "word/_rels/header1.xml.rels").contains("media/image2.png"));
    assert!(docx_entry(docx, "word/_rels/footer1.xml.rels").contains("media/image3.png"));

    let html = String::from_utf8(output.output(Target::Markup).unwrap().to_vec()).unwrap();
    assert!(html.matches("data:image/png;base64,").count() >= 4);
    assert!(!html.contains("Merci de votre confiance."));
}

#[test]
fn test_missing_assets_are_diagnosed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("header.png"), b"not a png").unwrap();
    let composer =
        Composer::new(ComposeConfig::new()).with_assets(DirectoryAssets::new(dir.path()));
    let output = compose_all(&composer, &[]);

    let missing: BTreeSet<AssetName> = output
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::AssetMissing { asset, .. } => Some(*asset),
            _ => None,
        })
        .collect();
    assert_eq!(missing, BTreeSet::from(AssetName::ALL));

    let undecodable = output.diagnostics.iter().any(|d| match d {
        Diagnostic::AssetMissing {
            asset: AssetName::Header,
            reason,
        } => reason.starts_with("undecodable"),
        _ => false,
    });
    assert!(undecodable);
}

#[test]
fn test_cover_assets_not_requested_when_disabled() {
    let composer = Composer::new(ComposeConfig::new().with_cover_pages(false, false))
        .with_assets(MemoryAssets::new());
    let output = composer
        .compose(&minimal_report(), &[], &BTreeSet::from([Target::Markup]))
        .unwrap();
    let missing: Vec<AssetName> = output
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::AssetMissing { asset, .. } => Some(*asset),
            _ => None,
        })
        .collect();
    assert_eq!(missing, vec![AssetName::Header, AssetName::Footer]);
}

#[test]
fn test_html_is_self_contained() {
    let output = compose_all(&Composer::default(), &full_photos());
    let html = String::from_utf8(output.output(Target::Markup).unwrap().to_vec()).unwrap();
    assert!(html.contains("<style>"));
    assert!(!html.contains("src=\"http"));
    assert!(!html.contains("<link"));
    assert_eq!(html.matches("<img").count(), full_photos().len());
}
