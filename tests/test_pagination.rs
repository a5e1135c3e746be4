//! Pagination through the public planning API.

mod common;

use common::{full_photos, full_report, minimal_report, photo};
use report_oxide::classify::classify;
use report_oxide::layout::{PageKind, PagePlan, PlacedContent};
use report_oxide::model::{ImageRecord, ReportRecord};
use report_oxide::sections::{build, Block};
use report_oxide::{ComposeConfig, Composer, Diagnostic, Target};

fn plan(config: ComposeConfig, report: &ReportRecord, images: &[ImageRecord]) -> PagePlan {
    let (plan, _) = Composer::new(config)
        .plan(report, images, Target::Canvas)
        .unwrap();
    plan
}

fn long_report(sentences: usize, conformity_rows: usize) -> ReportRecord {
    let conclusion = (0..sentences)
        .map(|i| format!("Observation numéro {} relevée lors du passage sur le bassin principal.", i))
        .collect::<Vec<_>>()
        .join("\n");
    let rows = (0..conformity_rows)
        .map(|i| format!(r#"{{"element": "Point de contrôle {}", "statut": "Conforme"}}"#, i))
        .collect::<Vec<_>>()
        .join(",");
    ReportRecord::from_json(&format!(
        r#"{{"client": {{"nom": "Durand"}}, "inspection": {{"date": "2024-05-14"}},
            "conformite": [{}], "bilan": {{"conclusion": {}}}}}"#,
        rows,
        serde_json::to_string(&conclusion).unwrap()
    ))
    .unwrap()
}

#[test]
fn test_cover_body_closing_numbering() {
    let plan = plan(ComposeConfig::new(), &full_report(), &full_photos());
    let total = plan.total_pages();
    assert!(total >= 3);
    assert_eq!(plan.pages.first().unwrap().kind, PageKind::Cover);
    assert_eq!(plan.pages.last().unwrap().kind, PageKind::Closing);
    assert!(plan.cover.is_some() && plan.closing.is_some());

    for (i, page) in plan.pages.iter().enumerate() {
        assert_eq!(page.number, i + 1);
        match page.kind {
            PageKind::Body => {
                let footer = page.footer.as_ref().unwrap();
                assert_eq!(footer.page_label, format!("Page {} / {}", i + 1, total));
                assert!(page.header.is_some());
            },
            _ => {
                assert!(page.header.is_none() && page.footer.is_none());
                assert!(page.placements.is_empty());
            },
        }
    }
}

#[test]
fn test_without_cover_pages() {
    let config = ComposeConfig::new().with_cover_pages(false, false);
    let plan = plan(config, &minimal_report(), &[]);
    assert_eq!(plan.total_pages(), 1);
    assert_eq!(plan.pages[0].kind, PageKind::Body);
    assert_eq!(plan.pages[0].footer.as_ref().unwrap().page_label, "Page 1 / 1");
    assert!(plan.cover.is_none());
}

#[test]
fn test_every_block_is_placed_in_order() {
    let report = full_report();
    let images = full_photos();
    let blocks = build(&report, &images, &classify(&images));
    let plan = plan(ComposeConfig::new(), &report, &images);

    let mut placed: Vec<usize> = plan.placements().map(|p| p.block).collect();
    placed.dedup();
    assert_eq!(placed, (0..blocks.len()).collect::<Vec<_>>());
}

#[test]
fn test_headings_stay_with_their_content() {
    let report = long_report(30, 30);
    let blocks = build(&report, &[], &classify(&[]));
    let plan = plan(ComposeConfig::new(), &report, &[]);

    for (index, block) in blocks.iter().enumerate() {
        if !block.is_heading() {
            continue;
        }
        let heading_page = plan.pages_of(index);
        let next_page = plan.pages_of(index + 1);
        assert_eq!(heading_page.len(), 1);
        assert_eq!(heading_page[0], next_page[0], "heading #{} orphaned", index);
    }
}

#[test]
fn test_tables_never_split_and_text_does() {
    let report = long_report(120, 25);
    let blocks = build(&report, &[], &classify(&[]));
    let plan = plan(ComposeConfig::new(), &report, &[]);

    for (index, block) in blocks.iter().enumerate() {
        let pages = plan.pages_of(index);
        match block {
            Block::FreeText(_) => assert!(pages.len() > 1, "text should span pages"),
            _ => assert_eq!(pages.len(), 1, "{} #{} split", block.kind_name(), index),
        }
    }

    // split text keeps every line exactly once
    let text_index = blocks
        .iter()
        .position(|b| matches!(b, Block::FreeText(_)))
        .unwrap();
    let lines: usize = plan
        .placements()
        .filter(|p| p.block == text_index)
        .map(|p| match &p.content {
            PlacedContent::TextLines(lines) => lines.len(),
            _ => 0,
        })
        .sum();
    assert!(lines >= 120);
}

#[test]
fn test_placements_stay_inside_the_body() {
    let config = ComposeConfig::new();
    let geometry = config.geometry;
    let plan = plan(config, &long_report(80, 40), &full_photos());
    for placement in plan.placements() {
        assert!(placement.top >= geometry.body_top() - 0.01);
        assert!(placement.bottom() <= geometry.body_bottom() + 0.01);
    }
}

#[test]
fn test_oversized_table_is_scaled_with_a_diagnostic() {
    let report = long_report(1, 90);
    let (plan, diagnostics) = Composer::new(ComposeConfig::new())
        .plan(&report, &[], Target::Canvas)
        .unwrap();

    assert_eq!(diagnostics.len(), 1);
    let Diagnostic::Overflow { kind, scale, .. } = &diagnostics[0] else {
        panic!("expected overflow, got {:?}", diagnostics[0]);
    };
    assert_eq!(kind, "table");
    assert!(*scale < 1.0 && *scale > 0.0);
    let scaled = plan.placements().find(|p| p.is_scaled()).unwrap();

    // the section title stays on the page of the table it introduces
    let blocks = build(&report, &[], &classify(&[]));
    assert!(blocks[scaled.block - 1].is_heading());
    assert_eq!(plan.pages_of(scaled.block - 1), plan.pages_of(scaled.block));
}

#[test]
fn test_image_fits_the_content_width() {
    let config = ComposeConfig::new();
    let width = config.geometry.content_width();
    let images = vec![
        ImageRecord::new(common::png(1, 400, 100), "image/png")
            .with_description("Vue d'ensemble du bassin"),
        photo(2, "Manomètre"),
    ];
    let plan = plan(config, &minimal_report(), &images);

    let placed: Vec<_> = plan
        .placements()
        .filter_map(|p| match &p.content {
            PlacedContent::Images(images) => Some(images.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(placed.len(), 2);
    for image in &placed {
        assert!(image.width <= width + 0.01);
        assert!(image.x_offset >= 0.0);
        assert!(image.x_offset + image.width <= width + 0.01);
    }
}

#[test]
fn test_plans_are_reproducible() {
    let report = full_report();
    let images = full_photos();
    let first = plan(ComposeConfig::new(), &report, &images);
    let second = plan(ComposeConfig::new(), &report, &images);
    assert_eq!(first, second);
}
