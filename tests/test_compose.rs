//! End-to-end composition across the three targets.

mod common;

use common::{full_photos, full_report, minimal_report, photo};
use report_oxide::classify::classify;
use report_oxide::sections::{build, section_order};
use report_oxide::writer::ContentStreamBuilder;
use report_oxide::{
    compose, ComposeConfig, ComposeOutput, Composer, ImageRecord, ReportRecord, Target,
};
use std::collections::BTreeSet;
use std::io::{Cursor, Read};

fn config() -> ComposeConfig {
    ComposeConfig::new()
        .with_compress(false)
        .with_office_timestamp("2024-05-14T09:00:00Z")
}

fn compose_all(report: &ReportRecord, images: &[ImageRecord]) -> ComposeOutput {
    let output = Composer::new(config())
        .compose(report, images, &Target::all())
        .unwrap();
    assert!(output.is_complete(), "failures: {:?}", output.failures);
    output
}

struct Rendered {
    pdf: String,
    document: String,
    html: String,
    media: usize,
}

fn rendered(output: &ComposeOutput) -> Rendered {
    let docx = output.output(Target::Office).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let media = archive
        .file_names()
        .filter(|n| n.starts_with("word/media/"))
        .count();
    let mut document = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut document)
        .unwrap();

    Rendered {
        pdf: String::from_utf8_lossy(output.output(Target::Canvas).unwrap()).into_owned(),
        document,
        html: String::from_utf8(output.output(Target::Markup).unwrap().to_vec()).unwrap(),
        media,
    }
}

/// Positions of each needle in `haystack`, `None` when absent.
fn positions(haystack: &str, needles: &[String]) -> Vec<Option<usize>> {
    needles.iter().map(|n| haystack.find(n.as_str())).collect()
}

fn is_increasing(positions: &[Option<usize>]) -> bool {
    positions.iter().all(Option::is_some) && positions.windows(2).all(|w| w[0] < w[1])
}

#[test]
fn test_single_equipment_row() {
    let report = ReportRecord::from_json(
        r#"{"client": {"nom": "Durand"}, "inspection": {"date": "2024-05-14"},
            "equipements": {"skimmer": {"quantite": 2}, "bonde_fond": {"quantite": 0},
                            "projecteur": 0}}"#,
    )
    .unwrap();
    let out = rendered(&compose_all(&report, &[]));

    assert_eq!(out.pdf.matches("(Skimmer)").count(), 1);
    assert!(!out.pdf.contains("(Bonde de fond)"));

    assert_eq!(out.document.matches(">Skimmer</w:t>").count(), 1);
    assert!(out.document.contains(">2</w:t>"));
    assert!(!out.document.contains("Projecteur"));

    assert_eq!(out.html.matches("<td>Skimmer</td><td>2</td>").count(), 1);
    assert!(!out.html.contains("Bonde de fond"));
}

#[test]
fn test_non_conforming_row_is_flagged_everywhere() {
    let report = full_report();
    let out = rendered(&compose_all(&report, &[]));
    let palette = config().palette;

    let fill = String::from_utf8(
        ContentStreamBuilder::new()
            .fill_color(palette.alert_background)
            .build(),
    )
    .unwrap();
    assert!(out.pdf.contains(fill.trim()));

    let docx_fill = format!("w:fill=\"{}\"", palette.alert_background.hex());
    assert!(out.document.contains(&docx_fill));

    assert_eq!(out.html.matches("<tr data-flag=\"non-conforming\"").count(), 1);
    assert_eq!(out.html.matches("<tr data-flag=\"watch\"").count(), 1);
}

#[test]
fn test_compact_status_spelling_is_flagged() {
    let report = ReportRecord::from_json(
        r#"{"client": {"nom": "Durand"}, "inspection": {"date": "2024-05-14"},
            "conformite": [{"element": "Canalisation skimmer", "statut": "NonConforme"},
                           {"element": "Bonde de fond", "statut": "Non-conforme"}]}"#,
    )
    .unwrap();
    let out = rendered(&compose_all(&report, &[]));
    let palette = config().palette;

    assert_eq!(out.html.matches("<tr data-flag=\"non-conforming\"").count(), 2);
    let docx_fill = format!("w:fill=\"{}\"", palette.alert_background.hex());
    assert!(out.document.contains(&docx_fill));
}

#[test]
fn test_zero_images() {
    let output = compose_all(&full_report(), &[]);
    let out = rendered(&output);
    assert!(!out.pdf.contains("/Subtype /Image"));
    assert_eq!(out.media, 0);
    assert!(!out.document.contains("<w:drawing>"));
    assert!(!out.html.contains("<img"));
    assert!(!out.html.contains("data-section=\"readings\""));
}

#[test]
fn test_missing_summary_leaves_no_trace() {
    let report = ReportRecord::from_json(
        r#"{"client": {"nom": "Durand"}, "inspection": {"date": "2024-05-14"},
            "bilan": {"conclusion": "", "recommandations": ["Vidanger le bassin"]}}"#,
    )
    .unwrap();
    let out = rendered(&compose_all(&report, &[]));
    assert!(!out.pdf.contains("(summary)"));
    assert!(!out.document.contains("section-summary"));
    assert!(!out.html.contains("data-section=\"summary\""));
    assert!(!out.html.contains("Recommandations"));
}

#[test]
fn test_section_order_agrees_across_targets() {
    let report = full_report();
    let images = full_photos();
    let keys: Vec<&str> = section_order(&build(&report, &images, &classify(&images)))
        .iter()
        .map(|s| s.key())
        .collect();
    assert_eq!(keys.len(), 9);

    let out = rendered(&compose_all(&report, &images));
    let marks: Vec<String> = keys
        .iter()
        .map(|k| format!("/Sect <</Id ({})>> BDC", k))
        .collect();
    let bookmarks: Vec<String> = keys
        .iter()
        .map(|k| format!("w:name=\"section-{}\"", k))
        .collect();
    let sections: Vec<String> = keys
        .iter()
        .map(|k| format!("data-section=\"{}\"", k))
        .collect();

    assert!(is_increasing(&positions(&out.pdf, &marks)));
    assert!(is_increasing(&positions(&out.document, &bookmarks)));
    assert!(is_increasing(&positions(&out.html, &sections)));
}

#[test]
fn test_identical_inputs_give_identical_bytes() {
    let report = full_report();
    let images = full_photos();
    let first = compose_all(&report, &images);
    let second = compose_all(&report, &images);
    for target in Target::ALL {
        assert_eq!(first.output(target), second.output(target), "{} differs", target);
    }
}

#[test]
fn test_only_requested_targets_are_rendered() {
    let output = Composer::new(config())
        .compose(&minimal_report(), &[], &BTreeSet::from([Target::Markup]))
        .unwrap();
    assert_eq!(output.outputs.keys().copied().collect::<Vec<_>>(), vec![Target::Markup]);

    let output = Composer::new(config())
        .compose(&minimal_report(), &[], &BTreeSet::new())
        .unwrap();
    assert!(output.outputs.is_empty());
    assert!(output.is_complete());
}

#[test]
fn test_default_entry_point() {
    let output = compose(&minimal_report(), &[], &Target::all()).unwrap();
    assert_eq!(output.outputs.len(), 3);
}

#[test]
fn test_missing_client_name_is_an_input_error() {
    let report = ReportRecord {
        inspection: minimal_report().inspection,
        ..ReportRecord::default()
    };
    let err = Composer::new(config())
        .compose(&report, &[], &Target::all())
        .unwrap_err();
    assert!(err.is_input_error());
}

#[test]
fn test_undecodable_placed_photo_aborts_the_run() {
    let images = vec![
        photo(1, "Skimmer"),
        ImageRecord::new(b"not an image".to_vec(), "image/png")
            .with_description("Vue d'ensemble du bassin"),
    ];
    let err = Composer::new(config())
        .compose(&minimal_report(), &images, &Target::all())
        .unwrap_err();
    assert!(err.is_input_error());
}

#[test]
fn test_unplaced_photos_are_not_probed() {
    let images = vec![
        photo(1, "Vue d'ensemble du bassin"),
        ImageRecord::new(b"garbage".to_vec(), "image/png").with_description("Logo"),
    ];
    let output = compose_all(&minimal_report(), &images);
    assert_eq!(rendered(&output).media, 1);
}
