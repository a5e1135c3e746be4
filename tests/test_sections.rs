//! Section model: presence, order and table contents.

mod common;

use common::{full_photos, full_report, minimal_report};
use report_oxide::classify::classify;
use report_oxide::model::ReportRecord;
use report_oxide::sections::{
    build, section_order, Accent, Block, ImageLayout, RowFlag, SectionId, TableKind,
};

fn blocks_of(report: &ReportRecord) -> Vec<Block> {
    build(report, &[], &classify(&[]))
}

fn table_after(blocks: &[Block], section: SectionId) -> &report_oxide::sections::TableBlock {
    let start = blocks
        .iter()
        .position(|b| matches!(b, Block::SectionTitle { section: s, .. } if *s == section))
        .expect("section present");
    blocks[start + 1..]
        .iter()
        .find_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
        .expect("table present")
}

#[test]
fn test_minimal_record_has_identification_only() {
    let blocks = blocks_of(&minimal_report());
    assert_eq!(section_order(&blocks), vec![SectionId::Identification]);

    let table = table_after(&blocks, SectionId::Identification);
    assert_eq!(table.kind, TableKind::KeyValue);
    assert_eq!(table.rows[0].cells, vec!["Client", "Alice Durand"]);
    assert_eq!(table.rows.last().unwrap().cells, vec!["Date d'intervention", "2024-05-14"]);
}

#[test]
fn test_full_record_section_order() {
    let images = full_photos();
    let blocks = build(&full_report(), &images, &classify(&images));
    assert_eq!(
        section_order(&blocks),
        vec![
            SectionId::Identification,
            SectionId::Pool,
            SectionId::Equipment,
            SectionId::TechnicalDescription,
            SectionId::TechnicalRoom,
            SectionId::Conformity,
            SectionId::Readings,
            SectionId::Summary,
            SectionId::Liability,
        ]
    );
}

#[test]
fn test_zero_quantities_are_omitted() {
    let blocks = blocks_of(&full_report());
    let table = table_after(&blocks, SectionId::Equipment);
    assert_eq!(table.headers, vec!["Équipement", "Quantité"]);
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0].cells, vec!["Skimmer", "2"]);
}

#[test]
fn test_no_equipment_no_heading() {
    let report = ReportRecord::from_json(
        r#"{"client": {"nom": "Durand"}, "inspection": {"date": "2024-05-14"},
            "equipements": {"skimmer": {"quantite": 0}, "projecteur": "0"}}"#,
    )
    .unwrap();
    assert!(!section_order(&blocks_of(&report)).contains(&SectionId::Equipment));
}

#[test]
fn test_conformity_rows_are_flagged() {
    let blocks = blocks_of(&full_report());
    let title_accent = blocks.iter().find_map(|b| match b {
        Block::SectionTitle {
            section: SectionId::Conformity,
            accent,
            ..
        } => Some(*accent),
        _ => None,
    });
    assert_eq!(title_accent, Some(Accent::Alert));

    let table = table_after(&blocks, SectionId::Conformity);
    assert_eq!(table.headers.len(), 3);
    let flags: Vec<RowFlag> = table.rows.iter().map(|r| r.flag).collect();
    assert_eq!(flags, vec![RowFlag::NonConforming, RowFlag::Normal, RowFlag::Watch]);
    assert_eq!(table.rows[0].cells[1], "Non conforme");
}

#[test]
fn test_comment_column_only_when_needed() {
    let report = ReportRecord::from_json(
        r#"{"client": {"nom": "Durand"}, "inspection": {"date": "2024-05-14"},
            "conformite": [{"element": "Skimmers", "statut": "Conforme"}]}"#,
    )
    .unwrap();
    let blocks = blocks_of(&report);
    let table = table_after(&blocks, SectionId::Conformity);
    assert_eq!(table.headers, vec!["Élément", "Statut"]);
}

#[test]
fn test_blank_conclusion_drops_summary() {
    let report = ReportRecord::from_json(
        r#"{"client": {"nom": "Durand"}, "inspection": {"date": "2024-05-14"},
            "bilan": {"conclusion": "   ", "recommandations": ["Vidanger"]},
            "responsabilite": "Constat du jour."}"#,
    )
    .unwrap();
    let order = section_order(&blocks_of(&report));
    assert!(!order.contains(&SectionId::Summary));
    assert_eq!(order.last(), Some(&SectionId::Liability));
}

#[test]
fn test_recommendations_follow_the_conclusion() {
    let blocks = blocks_of(&full_report());
    let start = blocks
        .iter()
        .position(|b| matches!(b, Block::SectionTitle { section: SectionId::Summary, .. }))
        .unwrap();
    assert!(matches!(&blocks[start + 1], Block::FreeText(p) if p.len() == 2));
    assert!(matches!(&blocks[start + 2], Block::Subtitle { text, .. } if text == "Recommandations"));
    match &blocks[start + 3] {
        Block::BulletList(items) => {
            assert_eq!(items[0], "Dégager la ventilation du local.");
        },
        other => panic!("expected bullets, got {:?}", other),
    }
}

#[test]
fn test_readings_are_paired() {
    let images = full_photos();
    let blocks = build(&full_report(), &images, &classify(&images));
    let pairs: Vec<_> = blocks
        .iter()
        .filter_map(|b| match b {
            Block::Image(image) if image.layout == ImageLayout::Paired => Some(image),
            _ => None,
        })
        .collect();
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].second.is_some());
    assert_eq!(pairs[0].first.caption.as_deref(), Some("Manomètre du filtre"));
}

#[test]
fn test_photos_alone_open_their_section() {
    let images = vec![common::photo(1, "Vue d'ensemble du bassin")];
    let blocks = build(&minimal_report(), &images, &classify(&images));
    assert_eq!(
        section_order(&blocks),
        vec![SectionId::Identification, SectionId::Pool]
    );
}

#[test]
fn test_compact_status_spellings_are_flagged() {
    let report = ReportRecord::from_json(
        r#"{"client": {"nom": "Durand"}, "inspection": {"date": "2024-05-14"},
            "conformite": [{"element": "Canalisation skimmer", "statut": "NonConforme"},
                           {"element": "Bonde de fond", "statut": "NON-CONFORME"}]}"#,
    )
    .unwrap();
    let blocks = blocks_of(&report);
    let table = table_after(&blocks, SectionId::Conformity);
    let flags: Vec<RowFlag> = table.rows.iter().map(|r| r.flag).collect();
    assert_eq!(flags, vec![RowFlag::NonConforming, RowFlag::NonConforming]);
    assert_eq!(table.rows[0].cells[1], "NonConforme");
}
