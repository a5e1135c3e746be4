//! Section model builder.
//!
//! Turns a [`ReportRecord`] and classified images into the ordered,
//! renderer-agnostic [`Block`] list. This is the only place that decides which
//! sections exist and in which order they appear; renderers never reorder or
//! drop blocks.

use crate::classify::{Bucket, ImageBuckets};
use crate::model::{ConformityStatus, ImageId, ImageRecord, ReportRecord};
use crate::text::{ensure_terminal_punctuation, is_blank, split_items, split_paragraphs};
use serde::Serialize;

/// Stable, format-independent section identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SectionId {
    /// Client and inspection metadata
    Identification,
    /// Pool attributes and overall views
    Pool,
    /// Equipment quantities and component photos
    Equipment,
    /// Technical description narrative
    TechnicalDescription,
    /// Technical room notes and photos
    TechnicalRoom,
    /// Conformity test results
    Conformity,
    /// Instrument readings
    Readings,
    /// Conclusion and recommendations
    Summary,
    /// Liability statement
    Liability,
}

impl SectionId {
    /// Identifier exposed by every renderer.
    pub fn key(&self) -> &'static str {
        match self {
            SectionId::Identification => "identification",
            SectionId::Pool => "pool",
            SectionId::Equipment => "equipment",
            SectionId::TechnicalDescription => "technical-description",
            SectionId::TechnicalRoom => "technical-room",
            SectionId::Conformity => "conformity",
            SectionId::Readings => "readings",
            SectionId::Summary => "summary",
            SectionId::Liability => "liability",
        }
    }

    /// Displayed title.
    pub fn title(&self) -> &'static str {
        match self {
            SectionId::Identification => "Informations générales",
            SectionId::Pool => "Caractéristiques du bassin",
            SectionId::Equipment => "Équipements",
            SectionId::TechnicalDescription => "Description technique",
            SectionId::TechnicalRoom => "Local technique",
            SectionId::Conformity => "Tests de conformité",
            SectionId::Readings => "Relevés des instruments",
            SectionId::Summary => "Bilan",
            SectionId::Liability => "Responsabilités",
        }
    }
}

/// Colour role of a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Accent {
    /// Default section colour
    Primary,
    /// Subtitles
    Secondary,
    /// Sections reporting a defect
    Alert,
}

/// Highlight of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum RowFlag {
    /// No highlight
    #[default]
    Normal,
    /// Failed conformity test
    NonConforming,
    /// Needs monitoring
    Watch,
}

impl RowFlag {
    /// Flag for a classified conformity status.
    pub fn from_status(status: ConformityStatus) -> Self {
        match status {
            ConformityStatus::Conforme => RowFlag::Normal,
            ConformityStatus::NonConforme => RowFlag::NonConforming,
            ConformityStatus::ASurveiller => RowFlag::Watch,
        }
    }

    /// Attribute value used by the markup target.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            RowFlag::Normal => None,
            RowFlag::NonConforming => Some("non-conforming"),
            RowFlag::Watch => Some("watch"),
        }
    }
}

/// Shape of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableKind {
    /// Two columns, label then value, no header row
    KeyValue,
    /// Header row followed by data rows
    Grid,
}

/// One data row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRowBlock {
    /// Cell texts
    pub cells: Vec<String>,
    /// Row highlight
    pub flag: RowFlag,
}

impl TableRowBlock {
    /// Unflagged row.
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            flag: RowFlag::Normal,
        }
    }

    /// Row with a highlight.
    pub fn flagged(cells: Vec<String>, flag: RowFlag) -> Self {
        Self { cells, flag }
    }
}

/// A table, never split across pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBlock {
    /// Table shape
    pub kind: TableKind,
    /// Header cells (empty for key/value tables)
    pub headers: Vec<String>,
    /// Data rows
    pub rows: Vec<TableRowBlock>,
}

impl TableBlock {
    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.cells.len())
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }
}

/// Arrangement of an image block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageLayout {
    /// One photo at full content width
    Single,
    /// Two photos side by side; a lone photo sits in the left half
    Paired,
}

/// A photo with its optional caption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureImage {
    /// Image reference
    pub id: ImageId,
    /// Caption text
    pub caption: Option<String>,
}

/// One or two photos, never split across pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageBlock {
    /// Left (or only) photo
    pub first: FigureImage,
    /// Right photo of a pair
    pub second: Option<FigureImage>,
    /// Arrangement
    pub layout: ImageLayout,
}

impl ImageBlock {
    /// Photos of the block, left to right.
    pub fn figures(&self) -> impl Iterator<Item = &FigureImage> {
        std::iter::once(&self.first).chain(self.second.as_ref())
    }
}

/// Renderer-agnostic content unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    /// Section heading
    SectionTitle {
        /// Section identifier
        section: SectionId,
        /// Displayed text
        text: String,
        /// Colour role
        accent: Accent,
    },
    /// Sub-heading inside a section
    Subtitle {
        /// Displayed text
        text: String,
        /// Colour role
        accent: Accent,
    },
    /// Table
    Table(TableBlock),
    /// Bullet list
    BulletList(Vec<String>),
    /// Photo block
    Image(ImageBlock),
    /// Paragraphs; the only block that may split across pages
    FreeText(Vec<String>),
}

impl Block {
    /// Section heading for a section.
    pub fn title(section: SectionId, accent: Accent) -> Self {
        Block::SectionTitle {
            section,
            text: section.title().to_string(),
            accent,
        }
    }

    /// Whether this is a heading kept with the following block.
    pub fn is_heading(&self) -> bool {
        matches!(self, Block::SectionTitle { .. } | Block::Subtitle { .. })
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::SectionTitle { .. } => "section title",
            Block::Subtitle { .. } => "subtitle",
            Block::Table(_) => "table",
            Block::BulletList(_) => "bullet list",
            Block::Image(_) => "image",
            Block::FreeText(_) => "free text",
        }
    }
}

/// Build the ordered block list.
pub fn build(report: &ReportRecord, images: &[ImageRecord], buckets: &ImageBuckets) -> Vec<Block> {
    let mut blocks = Vec::new();

    identification(report, &mut blocks);
    pool(report, images, buckets, &mut blocks);
    equipment(report, images, buckets, &mut blocks);
    technical_description(report, &mut blocks);
    technical_room(report, images, buckets, &mut blocks);
    conformity(report, &mut blocks);
    readings(images, buckets, &mut blocks);
    summary(report, &mut blocks);
    liability(report, &mut blocks);

    log::debug!(
        "Built {} blocks in {} sections",
        blocks.len(),
        section_order(&blocks).len()
    );
    blocks
}

/// Section identifiers in block order.
pub fn section_order(blocks: &[Block]) -> Vec<SectionId> {
    blocks
        .iter()
        .filter_map(|b| match b {
            Block::SectionTitle { section, .. } => Some(*section),
            _ => None,
        })
        .collect()
}

fn key_value(rows: Vec<(String, String)>) -> Block {
    Block::Table(TableBlock {
        kind: TableKind::KeyValue,
        headers: Vec::new(),
        rows: rows
            .into_iter()
            .map(|(k, v)| TableRowBlock::new(vec![k, v]))
            .collect(),
    })
}

fn caption_of(images: &[ImageRecord], id: ImageId) -> Option<String> {
    images
        .get(id.index())
        .map(|r| r.description.trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

fn single_images<'a>(
    images: &'a [ImageRecord],
    ids: &'a [ImageId],
) -> impl Iterator<Item = Block> + 'a {
    ids.iter().map(move |id| {
        Block::Image(ImageBlock {
            first: FigureImage {
                id: *id,
                caption: caption_of(images, *id),
            },
            second: None,
            layout: ImageLayout::Single,
        })
    })
}

fn identification(report: &ReportRecord, blocks: &mut Vec<Block>) {
    let client = &report.client;
    let inspection = &report.inspection;

    let mut rows = vec![("Client".to_string(), client.display_name())];
    let optional = [
        ("Adresse", client.full_address()),
        ("Téléphone", client.phone.trim().to_string()),
        ("Email", client.email.trim().to_string()),
    ];
    rows.extend(
        optional
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.to_string(), v)),
    );
    rows.push(("Date d'intervention".to_string(), inspection.date.trim().to_string()));

    let services: Vec<&str> = inspection
        .services
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let trailing = [
        ("Technicien", inspection.technician.trim().to_string()),
        ("Référence", inspection.reference.trim().to_string()),
        ("Prestations", services.join(", ")),
    ];
    rows.extend(
        trailing
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.to_string(), v)),
    );

    blocks.push(Block::title(SectionId::Identification, Accent::Primary));
    blocks.push(key_value(rows));
}

fn pool(
    report: &ReportRecord,
    images: &[ImageRecord],
    buckets: &ImageBuckets,
    blocks: &mut Vec<Block>,
) {
    let rows = report.pool.rows();
    let photos = buckets.get(Bucket::Primary);
    if rows.is_empty() && photos.is_empty() {
        return;
    }

    blocks.push(Block::title(SectionId::Pool, Accent::Primary));
    if !rows.is_empty() {
        blocks.push(key_value(
            rows.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
    }
    blocks.extend(single_images(images, photos));
}

fn equipment(
    report: &ReportRecord,
    images: &[ImageRecord],
    buckets: &ImageBuckets,
    blocks: &mut Vec<Block>,
) {
    let rows: Vec<TableRowBlock> = report
        .equipment
        .entries()
        .into_iter()
        .filter(|(_, quantity)| *quantity > 0)
        .map(|(label, quantity)| TableRowBlock::new(vec![label, quantity.to_string()]))
        .collect();
    let photos = buckets.get(Bucket::ComponentDetail);
    if rows.is_empty() && photos.is_empty() {
        return;
    }

    blocks.push(Block::title(SectionId::Equipment, Accent::Primary));
    if !rows.is_empty() {
        blocks.push(Block::Table(TableBlock {
            kind: TableKind::Grid,
            headers: vec!["Équipement".to_string(), "Quantité".to_string()],
            rows,
        }));
    }
    blocks.extend(single_images(images, photos));
}

fn technical_description(report: &ReportRecord, blocks: &mut Vec<Block>) {
    let items = split_items(&report.technical_description);
    if items.is_empty() {
        return;
    }
    blocks.push(Block::title(SectionId::TechnicalDescription, Accent::Primary));
    blocks.push(Block::BulletList(items));
}

fn technical_room(
    report: &ReportRecord,
    images: &[ImageRecord],
    buckets: &ImageBuckets,
    blocks: &mut Vec<Block>,
) {
    let items = split_items(&report.technical_room);
    let photos = buckets.get(Bucket::AuxiliarySite);
    if items.is_empty() && photos.is_empty() {
        return;
    }

    blocks.push(Block::title(SectionId::TechnicalRoom, Accent::Primary));
    if !items.is_empty() {
        blocks.push(Block::BulletList(items));
    }
    blocks.extend(single_images(images, photos));
}

fn conformity(report: &ReportRecord, blocks: &mut Vec<Block>) {
    if report.conformity.is_empty() {
        return;
    }

    let with_comments = report.conformity.iter().any(|r| !is_blank(&r.comment));
    let mut headers = vec!["Élément".to_string(), "Statut".to_string()];
    if with_comments {
        headers.push("Commentaire".to_string());
    }

    let rows: Vec<TableRowBlock> = report
        .conformity
        .iter()
        .map(|result| {
            let mut cells = vec![result.element.trim().to_string(), result.display_status()];
            if with_comments {
                cells.push(result.comment.trim().to_string());
            }
            TableRowBlock::flagged(cells, RowFlag::from_status(result.status()))
        })
        .collect();

    let accent = if rows.iter().any(|r| r.flag == RowFlag::NonConforming) {
        Accent::Alert
    } else {
        Accent::Primary
    };

    blocks.push(Block::title(SectionId::Conformity, accent));
    blocks.push(Block::Table(TableBlock {
        kind: TableKind::Grid,
        headers,
        rows,
    }));
}

fn readings(images: &[ImageRecord], buckets: &ImageBuckets, blocks: &mut Vec<Block>) {
    let photos = buckets.get(Bucket::InstrumentReading);
    if photos.is_empty() {
        return;
    }

    blocks.push(Block::title(SectionId::Readings, Accent::Primary));
    for pair in photos.chunks(2) {
        let figure = |id: ImageId| FigureImage {
            id,
            caption: caption_of(images, id),
        };
        blocks.push(Block::Image(ImageBlock {
            first: figure(pair[0]),
            second: pair.get(1).copied().map(figure),
            layout: ImageLayout::Paired,
        }));
    }
}

fn summary(report: &ReportRecord, blocks: &mut Vec<Block>) {
    let paragraphs = split_paragraphs(&report.summary.conclusion);
    if paragraphs.is_empty() {
        return;
    }

    blocks.push(Block::title(SectionId::Summary, Accent::Primary));
    blocks.push(Block::FreeText(paragraphs));

    let recommendations: Vec<String> = report
        .summary
        .recommendations
        .iter()
        .filter(|r| !is_blank(r))
        .map(|r| ensure_terminal_punctuation(r.trim()))
        .collect();
    if !recommendations.is_empty() {
        blocks.push(Block::Subtitle {
            text: "Recommandations".to_string(),
            accent: Accent::Secondary,
        });
        blocks.push(Block::BulletList(recommendations));
    }
}

fn liability(report: &ReportRecord, blocks: &mut Vec<Block>) {
    let paragraphs = split_paragraphs(&report.liability);
    if paragraphs.is_empty() {
        return;
    }
    blocks.push(Block::title(SectionId::Liability, Accent::Primary));
    blocks.push(Block::FreeText(paragraphs));
}
