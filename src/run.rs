//! The per-page pipeline state machine and the sequential batch driver.
//!
//! ## State machine
//!
//! ```text
//! IDLE ──▶ ANALYZING ──▶ CLEANING ──▶ [VERIFYING ──▶ CLEANING] ──▶ DONE
//!              │             │
//!              └─────────────┴────────▶ ERROR
//! ```
//!
//! One invocation of [`Pipeline::run_page`] always drives a page to a
//! terminal status (`DONE` or `ERROR`). The entry decision skips `ANALYZING`
//! when blocks already exist and no re-analysis was forced — that is also how
//! manual box edits are applied: re-invoke on a `DONE` page with
//! `force_reanalyze = false` and only the cleaning stages run against the
//! edited block set.
//!
//! ## Failure semantics
//!
//! Stage failures stop that page immediately and are recorded on the page;
//! they never abort sibling pages. The verification pass is a self-check and
//! is always non-fatal: if it fails, or if the second cleaning pass it
//! triggers fails, the page still finishes `DONE` with the first-pass image.
//! No stage retries automatically — retry is an explicit re-invocation by the
//! caller, which is cheap because `ANALYZING` is skippable once blocks exist.

use crate::capability::{RecognitionCapability, ReconstructionCapability};
use crate::config::PipelineConfig;
use crate::error::PageError;
use crate::page::{BatchStats, Page, PageStatus};
use crate::pipeline::consolidate::{consolidate_regions, CleanupRegion};
use crate::pipeline::encode::encode_png;
use crate::pipeline::mask::mask_regions;
use crate::pipeline::recognize::{RecognitionAdapter, RecognitionMode};
use crate::pipeline::reconstruct::ReconstructionAdapter;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Per-invocation options for [`Pipeline::run_page`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Re-run recognition even when the page already has blocks.
    pub force_reanalyze: bool,
    /// Run the verification pass after a successful cleaning.
    pub verify: bool,
    /// Cleanup padding override for this run, in pixels. Falls back to the
    /// page-level override, then the configured default.
    pub padding_px: Option<u32>,
}

/// The per-page text-removal pipeline.
///
/// Owns nothing but the capability handles and the configuration; pages are
/// taken by value and returned, never held across invocations.
pub struct Pipeline {
    recognition: RecognitionAdapter,
    reconstruction: ReconstructionAdapter,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        recognition: Arc<dyn RecognitionCapability>,
        reconstruction: Arc<dyn ReconstructionCapability>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            recognition: RecognitionAdapter::new(recognition),
            reconstruction: ReconstructionAdapter::new(reconstruction),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Drive one page to a terminal status.
    ///
    /// The returned page carries the updated image, blocks, status, and — on
    /// failure — a diagnostic in `last_error` alongside whatever partial
    /// state the page had, so a retry can skip redundant work.
    pub async fn run_page(&self, mut page: Page, opts: &RunOptions) -> Page {
        page.last_error = None;
        let padding = opts
            .padding_px
            .or(page.padding_px)
            .unwrap_or(self.config.padding_px);

        // Entry decision: existing blocks skip recognition unless forced.
        let run_analysis = page.blocks.is_empty() || opts.force_reanalyze;

        if run_analysis {
            self.set_status(&mut page, PageStatus::Analyzing);
            let png = match encode_png(&page.original_image) {
                Ok(png) => png,
                Err(e) => {
                    let err = PageError::RecognitionFailed {
                        page: page.id,
                        detail: format!("source image not encodable: {e}"),
                    };
                    return self.fail(page, err);
                }
            };
            match self
                .recognition
                .recognize(&png, RecognitionMode::Detailed, &self.config)
                .await
            {
                Ok(blocks) => {
                    info!("Page {}: recognized {} blocks", page.id, blocks.len());
                    page.baseline_blocks = blocks.clone();
                    page.blocks = blocks;
                }
                Err(e) => {
                    let err = PageError::RecognitionFailed {
                        page: page.id,
                        detail: e.to_string(),
                    };
                    return self.fail(page, err);
                }
            }
        } else {
            debug!(
                "Page {}: skipping analysis, {} blocks present",
                page.id,
                page.blocks.len()
            );
        }

        // First cleaning pass against the working block set.
        self.set_status(&mut page, PageStatus::Cleaning);
        let regions = consolidate_regions(&page.blocks, page.dimensions, padding, &self.config);
        let source = page.original_image.clone();
        let cleaned = self.clean(page.id, &source, &regions).await;
        match cleaned {
            Ok(image) => page.working_image = image,
            Err(err) => return self.fail(page, err),
        }

        if opts.verify {
            self.verify_and_retouch(&mut page, padding).await;
        }

        self.set_status(&mut page, PageStatus::Done);
        self.finish(page)
    }

    /// One cleaning pass: optional local mask, then reconstruction.
    ///
    /// The region list may be empty; reconstruction is still invoked so the
    /// capability can return the image unchanged.
    async fn clean(
        &self,
        page_id: usize,
        source: &DynamicImage,
        regions: &[CleanupRegion],
    ) -> Result<DynamicImage, PageError> {
        let submitted = if self.config.premask {
            mask_regions(source, regions)
        } else {
            source.clone()
        };

        let png = encode_png(&submitted).map_err(|e| PageError::ReconstructionFailed {
            page: page_id,
            detail: format!("image not encodable: {e}"),
        })?;

        let result = self
            .reconstruction
            .reconstruct(&png, regions, self.config.premask)
            .await
            .map_err(|e| PageError::ReconstructionFailed {
                page: page_id,
                detail: e.to_string(),
            })?;

        let bytes = result.ok_or(PageError::ReconstructionEmpty { page: page_id })?;

        image::load_from_memory(&bytes).map_err(|e| PageError::InvalidImage {
            page: page_id,
            detail: e.to_string(),
        })
    }

    /// Verification pass plus the residue-driven second cleaning.
    ///
    /// Every failure path here is non-fatal: the first pass already
    /// succeeded, so the page keeps its current `working_image` and proceeds
    /// to `DONE` regardless.
    async fn verify_and_retouch(&self, page: &mut Page, padding: u32) {
        self.set_status(page, PageStatus::Verifying);

        let png = match encode_png(&page.working_image) {
            Ok(png) => png,
            Err(e) => {
                warn!("Page {}: verification skipped, image not encodable: {e}", page.id);
                return;
            }
        };

        let verification = self
            .recognition
            .recognize(&png, RecognitionMode::Simple, &self.config)
            .await;
        let residue = match verification {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(
                    "Page {}: verification pass failed, skipping second clean: {e}",
                    page.id
                );
                return;
            }
        };

        if residue.is_empty() {
            debug!("Page {}: verification found no residue", page.id);
            return;
        }

        info!(
            "Page {}: verification found {} residue blocks, recleaning",
            page.id,
            residue.len()
        );

        // Residue blocks are always removable regardless of category, and the
        // retry widens every region to be more aggressive than the first pass.
        let mut residue = residue;
        for block in &mut residue {
            block.included = Some(true);
        }
        let wider = padding + self.config.verify_extra_padding_px;
        let regions = consolidate_regions(&residue, page.dimensions, wider, &self.config);

        self.set_status(page, PageStatus::Cleaning);
        let source = page.working_image.clone();
        let retouched = self.clean(page.id, &source, &regions).await;
        match retouched {
            Ok(image) => page.working_image = image,
            Err(e) => {
                warn!(
                    "Page {}: second cleaning pass failed, keeping first-pass image: {e}",
                    page.id
                );
            }
        }
    }

    /// Run the pipeline for each page in order, strictly sequentially.
    ///
    /// Pages already `DONE` are skipped. A fixed delay is inserted between
    /// pages as a rate-limiting courtesy to the external capabilities. A page
    /// ending in `ERROR` never stops the batch.
    pub async fn run_batch(&self, pages: Vec<Page>, opts: &RunOptions) -> (Vec<Page>, BatchStats) {
        let start = Instant::now();
        let mut stats = BatchStats::default();

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(pages.len());
        }

        let mut out = Vec::with_capacity(pages.len());
        let mut first = true;
        for page in pages {
            if page.status == PageStatus::Done && !opts.force_reanalyze {
                out.push(page);
                continue;
            }

            if !first && self.config.inter_page_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.inter_page_delay_ms)).await;
            }
            first = false;

            stats.total += 1;
            let page = self.run_page(page, opts).await;
            match page.status {
                PageStatus::Done => stats.completed += 1,
                PageStatus::Error => stats.failed += 1,
                _ => unreachable!("run_page always returns a terminal status"),
            }
            out.push(page);
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(stats.total, stats.completed);
        }
        info!(
            "Batch finished: {}/{} pages done, {} failed, {}ms",
            stats.completed, stats.total, stats.failed, stats.duration_ms
        );
        (out, stats)
    }

    /// Consolidate and locally mask the page's current blocks without calling
    /// any capability — "preview the mask before sending to reconstruction".
    pub fn preview_mask(&self, page: &Page) -> DynamicImage {
        let padding = page.padding_px.unwrap_or(self.config.padding_px);
        let regions = consolidate_regions(&page.blocks, page.dimensions, padding, &self.config);
        mask_regions(&page.original_image, &regions)
    }

    fn set_status(&self, page: &mut Page, status: PageStatus) {
        page.status = status;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_change(page.id, status);
        }
    }

    fn fail(&self, mut page: Page, err: PageError) -> Page {
        warn!("Page {}: {err}", page.id);
        page.last_error = Some(err);
        self.set_status(&mut page, PageStatus::Error);
        self.finish(page)
    }

    fn finish(&self, page: Page) -> Page {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_page_finished(page.id, page.status);
        }
        page
    }
}
