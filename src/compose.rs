//! Composition entry point.
//!
//! One run classifies the photos, builds the section model, probes the placed
//! images and loads the branding assets once, then paginates and renders each
//! requested target independently. A failing target is recorded in
//! [`ComposeOutput::failures`] and never hides the others; only input errors
//! abort the run.

use crate::assets::{AssetName, AssetStore, LoadedAssets, NoAssets};
use crate::classify::Classifier;
use crate::config::ComposeConfig;
use crate::converters::{renderer_for, RenderContext};
use crate::error::{Error, Result};
use crate::layout::{BlockMeasurer, PageFrame, PagePlan, Paginator};
use crate::model::{ImageCatalog, ImageRecord, ReportRecord};
use crate::sections::{self, Block};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Output format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Paginated PDF
    Canvas,
    /// Editable DOCX
    Office,
    /// Self-contained HTML
    Markup,
}

impl Target {
    /// Every target, in output order.
    pub const ALL: [Target; 3] = [Target::Canvas, Target::Office, Target::Markup];

    /// File extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Target::Canvas => "pdf",
            Target::Office => "docx",
            Target::Markup => "html",
        }
    }

    /// Media type of the produced bytes.
    pub fn media_type(&self) -> &'static str {
        match self {
            Target::Canvas => "application/pdf",
            Target::Office => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            },
            Target::Markup => "text/html; charset=utf-8",
        }
    }

    /// Lower-case name.
    pub fn name(&self) -> &'static str {
        match self {
            Target::Canvas => "canvas",
            Target::Office => "office",
            Target::Markup => "markup",
        }
    }

    /// Every target as a set.
    pub fn all() -> BTreeSet<Target> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" | "canvas" => Ok(Target::Canvas),
            "docx" | "office" => Ok(Target::Office),
            "html" | "markup" => Ok(Target::Markup),
            other => Err(Error::InvalidInput(format!("unknown target '{}'", other))),
        }
    }
}

/// Recovered problem reported alongside the outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Diagnostic {
    /// An asset was missing or undecodable; its text fallback was used
    AssetMissing {
        /// Asset concerned
        asset: AssetName,
        /// Why it could not be used
        reason: String,
    },
    /// A block taller than a page body was scaled down
    Overflow {
        /// Target being paginated
        target: Target,
        /// Block index in the section model
        block: usize,
        /// Block kind
        kind: String,
        /// Applied scale
        scale: f32,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::AssetMissing { asset, reason } => {
                write!(f, "asset {} missing: {}", asset, reason)
            },
            Diagnostic::Overflow {
                target,
                block,
                kind,
                scale,
            } => write!(f, "{}: {} #{} scaled to {:.2}", target, kind, block, scale),
        }
    }
}

/// Result of a composition run.
#[derive(Debug, Default)]
pub struct ComposeOutput {
    /// Bytes of every target that rendered
    pub outputs: BTreeMap<Target, Vec<u8>>,
    /// Error of every target that failed
    pub failures: BTreeMap<Target, Error>,
    /// Recovered problems
    pub diagnostics: Vec<Diagnostic>,
}

impl ComposeOutput {
    /// Bytes of one target.
    pub fn output(&self, target: Target) -> Option<&[u8]> {
        self.outputs.get(&target).map(Vec::as_slice)
    }

    /// Whether every requested target rendered.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything derived from the inputs before pagination.
struct Prepared {
    blocks: Vec<Block>,
    catalog: ImageCatalog,
}

/// Configurable composer.
///
/// Holds no run state; a composer can be shared between threads and reused.
pub struct Composer {
    config: ComposeConfig,
    classifier: Classifier,
    assets: Box<dyn AssetStore>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(ComposeConfig::default())
    }
}

impl Composer {
    /// Composer without assets.
    pub fn new(config: ComposeConfig) -> Self {
        Self {
            config,
            classifier: Classifier::default(),
            assets: Box::new(NoAssets),
        }
    }

    /// Use an asset store.
    pub fn with_assets(mut self, store: impl AssetStore + 'static) -> Self {
        self.assets = Box::new(store);
        self
    }

    /// Use a custom classifier.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    fn prepare(&self, report: &ReportRecord, images: &[ImageRecord]) -> Result<Prepared> {
        self.config.validate()?;
        report.validate()?;

        let buckets = self.classifier.classify(images);
        let blocks = sections::build(report, images, &buckets);
        let placed = blocks.iter().flat_map(|b| match b {
            Block::Image(image) => image.figures().map(|f| f.id).collect::<Vec<_>>(),
            _ => Vec::new(),
        });
        let catalog = ImageCatalog::probe(images, placed)?;

        Ok(Prepared { blocks, catalog })
    }

    fn required_assets(&self) -> Vec<AssetName> {
        AssetName::ALL
            .into_iter()
            .filter(|name| match name {
                AssetName::Cover => self.config.cover_page,
                AssetName::Closing => self.config.closing_page,
                AssetName::Header | AssetName::Footer => true,
            })
            .collect()
    }

    /// Lay out the report for one target without rendering it.
    pub fn plan(
        &self,
        report: &ReportRecord,
        images: &[ImageRecord],
        target: Target,
    ) -> Result<(PagePlan, Vec<Diagnostic>)> {
        let prepared = self.prepare(report, images)?;
        let frame = PageFrame::new(report, &self.config);
        let renderer = renderer_for(target)?;
        let metrics = renderer.metrics();
        let measurer = BlockMeasurer::new(metrics.as_ref(), &self.config, &prepared.catalog);
        Paginator::new(measurer, &frame, target).paginate(&prepared.blocks)
    }

    /// Compose the report into every requested target.
    pub fn compose(
        &self,
        report: &ReportRecord,
        images: &[ImageRecord],
        targets: &BTreeSet<Target>,
    ) -> Result<ComposeOutput> {
        let prepared = self.prepare(report, images)?;
        let mut output = ComposeOutput::default();
        if targets.is_empty() {
            return Ok(output);
        }

        let assets = LoadedAssets::load(
            self.assets.as_ref(),
            self.required_assets(),
            &mut output.diagnostics,
        );
        let frame = PageFrame::new(report, &self.config);
        let context = RenderContext {
            report,
            blocks: &prepared.blocks,
            images,
            catalog: &prepared.catalog,
            assets: &assets,
            config: &self.config,
        };

        for &target in targets {
            match self.render_target(&context, &frame, target, &mut output.diagnostics) {
                Ok(bytes) => {
                    log::info!("{}: {} bytes", target, bytes.len());
                    output.outputs.insert(target, bytes);
                },
                Err(e) => {
                    let e = e.for_target(target);
                    log::warn!("{}", e);
                    output.failures.insert(target, e);
                },
            }
        }

        log::info!(
            "Composed {} of {} targets ({} diagnostics)",
            output.outputs.len(),
            targets.len(),
            output.diagnostics.len()
        );
        Ok(output)
    }

    fn render_target(
        &self,
        context: &RenderContext<'_>,
        frame: &PageFrame,
        target: Target,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<u8>> {
        let renderer = renderer_for(target)?;
        let metrics = renderer.metrics();
        let measurer = BlockMeasurer::new(metrics.as_ref(), &self.config, context.catalog);
        let (plan, overflow) = Paginator::new(measurer, frame, target).paginate(context.blocks)?;
        diagnostics.extend(overflow);
        renderer.render(context, &plan)
    }
}

/// Compose with the default configuration and no assets.
///
/// # Examples
///
/// ```no_run
/// use report_oxide::{compose, ReportRecord, Target};
///
/// let report = ReportRecord::from_json(r#"{"client": {"nom": "Durand"},
///     "inspection": {"date": "2024-05-14"}}"#)?;
/// let output = compose(&report, &[], &Target::all())?;
/// assert!(output.is_complete());
/// # Ok::<(), report_oxide::Error>(())
/// ```
pub fn compose(
    report: &ReportRecord,
    images: &[ImageRecord],
    targets: &BTreeSet<Target>,
) -> Result<ComposeOutput> {
    Composer::default().compose(report, images, targets)
}
