//! Cursor-driven page filling.

use super::measure::{text_height, BlockMeasurer, Measured, BLOCK_GAP};
use super::{
    page_label, FooterDescriptor, Page, PageFrame, PageKind, PagePlan, PlacedContent, Placement,
    TextLine,
};
use crate::compose::{Diagnostic, Target};
use crate::error::{Error, Result};
use crate::geometry::{Cursor, PageGeometry};
use crate::sections::Block;

/// Lifecycle of one body page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// No page open
    Empty,
    /// Header band reserved, nothing placed yet
    HeaderPlaced,
    /// At least one block placed
    Filling,
    /// Footer band reserved, page complete
    FooterPlaced,
}

/// Explicit page state machine.
///
/// Legal edges: `Empty → HeaderPlaced → Filling (→ Filling)* → FooterPlaced → Empty`,
/// plus `HeaderPlaced → FooterPlaced` for a page closed before any content.
/// Any other edge is a programming error reported as [`Error::Layout`].
#[derive(Debug, Clone)]
pub struct PageStateMachine {
    state: PageState,
}

impl Default for PageStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStateMachine {
    /// Machine in the `Empty` state.
    pub fn new() -> Self {
        Self {
            state: PageState::Empty,
        }
    }

    /// Current state.
    pub fn state(&self) -> PageState {
        self.state
    }

    /// Move to `to`, rejecting illegal edges.
    pub fn transition(&mut self, to: PageState) -> Result<()> {
        use PageState::*;
        let legal = matches!(
            (self.state, to),
            (Empty, HeaderPlaced)
                | (HeaderPlaced, Filling)
                | (Filling, Filling)
                | (HeaderPlaced, FooterPlaced)
                | (Filling, FooterPlaced)
                | (FooterPlaced, Empty)
        );
        if !legal {
            return Err(Error::Layout(format!(
                "illegal page transition {:?} -> {:?}",
                self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }
}

/// Places measured blocks on pages for one target.
pub struct Paginator<'a> {
    measurer: BlockMeasurer<'a>,
    frame: &'a PageFrame,
    target: Target,
}

/// Mutable state of one pagination pass.
struct Run<'f> {
    geometry: PageGeometry,
    frame: &'f PageFrame,
    machine: PageStateMachine,
    cursor: Cursor,
    current: Page,
    pages: Vec<Page>,
    opened: bool,
}

impl<'f> Run<'f> {
    fn new(geometry: PageGeometry, frame: &'f PageFrame) -> Self {
        Self {
            cursor: Cursor::new(&geometry),
            geometry,
            frame,
            machine: PageStateMachine::new(),
            current: Page::bare(PageKind::Body),
            pages: Vec::new(),
            opened: false,
        }
    }

    fn open_page(&mut self) -> Result<()> {
        self.machine.transition(PageState::HeaderPlaced)?;
        if self.opened {
            self.cursor.break_page(&self.geometry);
        }
        self.opened = true;
        self.current = Page {
            header: Some(self.frame.header.clone()),
            ..Page::bare(PageKind::Body)
        };
        Ok(())
    }

    fn close_page(&mut self) -> Result<()> {
        self.machine.transition(PageState::FooterPlaced)?;
        self.current.footer = Some(FooterDescriptor {
            text: self.frame.footer_text.clone(),
            page_label: String::new(),
        });
        let page = std::mem::replace(&mut self.current, Page::bare(PageKind::Body));
        self.pages.push(page);
        self.machine.transition(PageState::Empty)
    }

    fn break_page(&mut self) -> Result<()> {
        self.close_page()?;
        self.open_page()
    }

    fn has_content(&self) -> bool {
        self.machine.state() == PageState::Filling
    }

    fn fits(&self, height: f32) -> bool {
        self.cursor.fits(height, &self.geometry)
    }

    fn remaining(&self) -> f32 {
        self.cursor.remaining(&self.geometry)
    }

    fn place(&mut self, block: usize, height: f32, scale: f32, content: PlacedContent) -> Result<()> {
        self.machine.transition(PageState::Filling)?;
        self.current.placements.push(Placement {
            block,
            top: self.cursor.offset,
            height,
            scale,
            content,
        });
        self.cursor.advance(height);
        Ok(())
    }
}

/// Height a heading needs on its page: itself, any headings directly after
/// it and the first unit of the block they introduce.
fn heading_group_height(
    blocks: &[Block],
    measured: &[Measured],
    index: usize,
    body_height: f32,
) -> f32 {
    let mut needed = measured[index].height.min(body_height);
    for (block, m) in blocks.iter().zip(measured).skip(index + 1) {
        needed += BLOCK_GAP + m.first_unit.min(body_height);
        if !block.is_heading() {
            break;
        }
    }
    needed
}

impl<'a> Paginator<'a> {
    /// Create a paginator for one target.
    pub fn new(measurer: BlockMeasurer<'a>, frame: &'a PageFrame, target: Target) -> Self {
        Self {
            measurer,
            frame,
            target,
        }
    }

    /// Lay out the blocks.
    ///
    /// Returns the plan and the overflow diagnostics raised on the way.
    pub fn paginate(&self, blocks: &[Block]) -> Result<(PagePlan, Vec<Diagnostic>)> {
        let config = self.measurer.config();
        let geometry = config.geometry;
        let body_height = geometry.body_height();
        let measured = blocks
            .iter()
            .map(|b| self.measurer.measure(b))
            .collect::<Result<Vec<_>>>()?;

        let mut diagnostics = Vec::new();
        let mut run = Run::new(geometry, self.frame);
        run.open_page()?;

        // set while the previous block is a heading on the current page
        let mut after_heading = false;
        for (index, (block, m)) in blocks.iter().zip(&measured).enumerate() {
            if m.splittable {
                self.place_lines(&mut run, index, m)?;
            } else {
                let needed = if block.is_heading() {
                    heading_group_height(blocks, &measured, index, body_height)
                } else {
                    m.height.min(body_height)
                };
                if !after_heading && !run.fits(needed) && run.has_content() {
                    log::debug!(
                        "{}: {} #{} moves to page {}",
                        self.target,
                        block.kind_name(),
                        index,
                        run.pages.len() + 2
                    );
                    run.break_page()?;
                }

                let available = if after_heading {
                    run.remaining()
                } else {
                    body_height
                };
                if m.height > available && available > 0.0 {
                    let scale = available / m.height;
                    log::warn!(
                        "{}: {} #{} is taller than the space left ({:.1}pt), scaled to {:.2}",
                        self.target,
                        block.kind_name(),
                        index,
                        m.height,
                        scale
                    );
                    diagnostics.push(Diagnostic::Overflow {
                        target: self.target,
                        block: index,
                        kind: block.kind_name().to_string(),
                        scale,
                    });
                    run.place(index, available, scale, m.content.clone())?;
                } else {
                    run.place(index, m.height, 1.0, m.content.clone())?;
                }
            }
            after_heading = block.is_heading();
            run.cursor.advance(BLOCK_GAP);
        }
        run.close_page()?;

        let mut pages = Vec::with_capacity(run.pages.len() + 2);
        if self.frame.cover.is_some() {
            pages.push(Page::bare(PageKind::Cover));
        }
        pages.append(&mut run.pages);
        if self.frame.closing.is_some() {
            pages.push(Page::bare(PageKind::Closing));
        }

        let total = pages.len();
        for (i, page) in pages.iter_mut().enumerate() {
            page.number = i + 1;
            if let Some(footer) = page.footer.as_mut() {
                footer.page_label = page_label(i + 1, total);
            }
        }

        log::info!(
            "{}: {} blocks on {} pages ({} scaled)",
            self.target,
            blocks.len(),
            total,
            diagnostics.len()
        );

        Ok((
            PagePlan {
                pages,
                cover: self.frame.cover.clone(),
                closing: self.frame.closing.clone(),
            },
            diagnostics,
        ))
    }

    /// Place free text line by line, breaking pages between lines.
    fn place_lines(&self, run: &mut Run<'_>, index: usize, m: &Measured) -> Result<()> {
        let PlacedContent::TextLines(lines) = &m.content else {
            return Err(Error::Layout(format!("block #{} is splittable but not text", index)));
        };
        let typo = &self.measurer.config().typography;
        let line_height = typo.line_height(typo.body_size);

        let mut chunk: Vec<TextLine> = Vec::new();
        for line in lines {
            let step = match chunk.last() {
                Some(last) if last.paragraph != line.paragraph => line_height * 1.5,
                _ => line_height,
            };
            let chunk_height = text_height(&chunk, line_height);
            if !run.fits(chunk_height + step) {
                if !chunk.is_empty() {
                    run.place(
                        index,
                        chunk_height,
                        1.0,
                        PlacedContent::TextLines(std::mem::take(&mut chunk)),
                    )?;
                    run.break_page()?;
                } else if run.has_content() {
                    run.break_page()?;
                }
            }
            chunk.push(line.clone());
        }

        if !chunk.is_empty() {
            let height = text_height(&chunk, line_height);
            run.place(index, height, 1.0, PlacedContent::TextLines(chunk))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComposeConfig;
    use crate::model::{ImageCatalog, ReportRecord};
    use crate::sections::{Accent, SectionId, TableBlock, TableKind, TableRowBlock};
    use crate::writer::Base14Metrics;

    fn paginate(config: &ComposeConfig, blocks: &[Block]) -> (PagePlan, Vec<Diagnostic>) {
        let catalog = ImageCatalog::default();
        let metrics = Base14Metrics::helvetica();
        let frame = PageFrame::new(&ReportRecord::default(), config);
        let measurer = BlockMeasurer::new(&metrics, config, &catalog);
        Paginator::new(measurer, &frame, Target::Canvas)
            .paginate(blocks)
            .unwrap()
    }

    fn grid(rows: usize) -> Block {
        Block::Table(TableBlock {
            kind: TableKind::Grid,
            headers: vec!["Élément".to_string(), "Statut".to_string()],
            rows: (0..rows)
                .map(|i| TableRowBlock::new(vec![format!("Ligne {}", i), "Conforme".to_string()]))
                .collect(),
        })
    }

    fn bare_config() -> ComposeConfig {
        ComposeConfig::new().with_cover_pages(false, false)
    }

    #[test]
    fn test_state_machine_edges() {
        let mut m = PageStateMachine::new();
        assert!(m.transition(PageState::Filling).is_err());
        m.transition(PageState::HeaderPlaced).unwrap();
        m.transition(PageState::Filling).unwrap();
        m.transition(PageState::Filling).unwrap();
        assert!(m.transition(PageState::HeaderPlaced).is_err());
        m.transition(PageState::FooterPlaced).unwrap();
        assert!(m.transition(PageState::Filling).is_err());
        m.transition(PageState::Empty).unwrap();
        assert_eq!(m.state(), PageState::Empty);
    }

    #[test]
    fn test_single_page_labels() {
        let (plan, diagnostics) = paginate(
            &bare_config(),
            &[Block::title(SectionId::Identification, Accent::Primary), grid(3)],
        );
        assert!(diagnostics.is_empty());
        assert_eq!(plan.total_pages(), 1);
        let page = &plan.pages[0];
        assert_eq!(page.placements.len(), 2);
        assert_eq!(page.placements[0].top, 96.0);
        assert_eq!(page.footer.as_ref().unwrap().page_label, "Page 1 / 1");
    }

    #[test]
    fn test_cover_and_closing_count_in_labels() {
        let config = ComposeConfig::new().with_cover_pages(true, true);
        let (plan, _) = paginate(&config, &[grid(2)]);
        assert_eq!(plan.total_pages(), 3);
        assert_eq!(plan.pages[0].kind, PageKind::Cover);
        assert_eq!(plan.pages[2].kind, PageKind::Closing);
        assert!(plan.pages[0].footer.is_none());
        assert_eq!(plan.pages[1].footer.as_ref().unwrap().page_label, "Page 2 / 3");
    }

    #[test]
    fn test_tables_never_split() {
        let blocks: Vec<Block> = (0..8).map(|_| grid(12)).collect();
        let (plan, _) = paginate(&bare_config(), &blocks);
        assert!(plan.total_pages() > 1);
        for index in 0..blocks.len() {
            assert_eq!(plan.pages_of(index).len(), 1);
        }
        for page in &plan.pages {
            for p in &page.placements {
                assert!(p.bottom() <= 778.0 + 0.01);
            }
        }
    }

    #[test]
    fn test_heading_kept_with_next_block() {
        let mut blocks: Vec<Block> = (0..3).map(|_| grid(12)).collect();
        blocks.push(Block::title(SectionId::Conformity, Accent::Primary));
        blocks.push(grid(12));
        let (plan, _) = paginate(&bare_config(), &blocks);
        assert_eq!(plan.pages_of(3), plan.pages_of(4));
    }

    #[test]
    fn test_oversized_table_is_scaled_under_its_heading() {
        let (plan, diagnostics) = paginate(
            &bare_config(),
            &[Block::title(SectionId::Conformity, Accent::Alert), grid(120)],
        );
        assert_eq!(diagnostics.len(), 1);
        let Diagnostic::Overflow { block, scale, .. } = &diagnostics[0] else {
            panic!("expected overflow");
        };
        assert_eq!(*block, 1);
        assert!(*scale < 1.0);
        assert_eq!(plan.total_pages(), 1);
        assert_eq!(plan.pages_of(0), plan.pages_of(1));
        let placement = plan.placements().find(|p| p.block == 1).unwrap();
        assert!(placement.is_scaled());
        assert!(placement.top > 96.0);
        assert!((placement.bottom() - 778.0).abs() < 1e-3);
    }

    #[test]
    fn test_heading_moves_with_oversized_table() {
        let blocks = vec![
            grid(20),
            Block::title(SectionId::Conformity, Accent::Alert),
            Block::Subtitle {
                text: "Détail".to_string(),
                accent: Accent::Primary,
            },
            grid(120),
        ];
        let (plan, diagnostics) = paginate(&bare_config(), &blocks);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(plan.total_pages(), 2);
        assert_eq!(plan.pages_of(1), vec![1]);
        assert_eq!(plan.pages_of(2), vec![1]);
        assert_eq!(plan.pages_of(3), vec![1]);
    }

    #[test]
    fn test_free_text_splits_at_lines() {
        let paragraphs: Vec<String> = (0..80)
            .map(|i| format!("Paragraphe {} du rapport.", i))
            .collect();
        let (plan, diagnostics) = paginate(&bare_config(), &[Block::FreeText(paragraphs)]);
        assert!(diagnostics.is_empty());
        let pages = plan.pages_of(0);
        assert!(pages.len() >= 2);

        let mut seen = Vec::new();
        for p in plan.placements() {
            let PlacedContent::TextLines(lines) = &p.content else {
                panic!("expected text");
            };
            assert!(p.bottom() <= 778.0 + 0.01);
            seen.extend(lines.iter().map(|l| l.paragraph));
        }
        assert_eq!(seen, (0..80).collect::<Vec<_>>());
    }
}
