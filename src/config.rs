//! Configuration types for the text-removal pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across pages, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::SlidewipeError;
use crate::progress::ProgressCallback;
use std::fmt;

/// How the detailed recognition pass is issued.
///
/// Both strategies satisfy the same post-processing contract (inclusion
/// stamping, reading-order sort); they differ only in recall/latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognitionStrategy {
    /// One request asking for geometry and styling together. Cheapest.
    OneCall,
    /// A geometry-only pass followed by a style-enrichment pass that
    /// re-submits the detected boxes. Trades latency for recall on dense
    /// layouts. (default)
    #[default]
    TwoCall,
}

/// Configuration for the per-page text-removal pipeline.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use slidewipe::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .padding_px(24)
///     .premask(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Default cleanup padding in pixels, converted to normalized units per
    /// axis against the page dimensions. Default: 20.
    ///
    /// Padding absorbs anti-aliasing halos and drop shadows around glyphs
    /// that the detector's tight boxes miss. A page-level override and a
    /// per-run override both take precedence over this value.
    pub padding_px: u32,

    /// Extra padding, in pixels, applied to the second cleaning pass driven
    /// by verification residue. Default: 10.
    ///
    /// Residue means the first pass was not aggressive enough, so the retry
    /// widens every region by a fixed margin.
    pub verify_extra_padding_px: u32,

    /// Adjacency threshold for region merging, on the 0–1000 scale.
    /// Default: 15 (1.5% of the page).
    ///
    /// Larger values merge whole paragraphs into one region and produce
    /// fewer, bigger masks; smaller values keep lines separate.
    pub merge_threshold: f32,

    /// Maximum number of cleanup regions sent to reconstruction. Default: 24.
    ///
    /// Very dense text pages would otherwise produce pathological prompts.
    /// Regions beyond the cap are dropped in detection order.
    pub max_regions: usize,

    /// Same-line tolerance for reading-order sorting, on the 0–1000 vertical
    /// scale. Default: 20 (2% of the page height).
    pub line_tolerance: f32,

    /// Run the local mask pass before calling reconstruction. Default: true.
    ///
    /// Pre-masking paints an approximate background over each region so the
    /// external model only has to dissolve soft edges instead of inventing
    /// whole fills, and it leaves a deterministic fallback if reconstruction
    /// is skipped.
    pub premask: bool,

    /// Recognition call strategy. Default: [`RecognitionStrategy::TwoCall`].
    pub strategy: RecognitionStrategy,

    /// Delay inserted between pages by the batch driver, in milliseconds.
    /// Default: 300.
    ///
    /// A rate-limiting courtesy towards the external capabilities, not a
    /// correctness requirement.
    pub inter_page_delay_ms: u64,

    /// Per-capability-call timeout in seconds. Default: 120.
    ///
    /// Applied when a capability client is built from this config
    /// ([`crate::gemini::GeminiClient::from_config`]); hand-built
    /// capabilities are expected to honor it themselves.
    pub api_timeout_secs: u64,

    /// Sampling temperature for capability calls. Default: 0.0.
    ///
    /// Recognition is transcription; creativity only hurts. Applied via
    /// [`crate::gemini::GeminiClient::from_config`], like the timeout.
    pub temperature: f32,

    /// Custom detection prompt override. If None, uses the built-in default.
    pub detection_prompt: Option<String>,

    /// Custom detailed (one-call) prompt override.
    pub detailed_prompt: Option<String>,

    /// Observer for page status transitions.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            padding_px: 20,
            verify_extra_padding_px: 10,
            merge_threshold: 15.0,
            max_regions: 24,
            line_tolerance: 20.0,
            premask: true,
            strategy: RecognitionStrategy::default(),
            inter_page_delay_ms: 300,
            api_timeout_secs: 120,
            temperature: 0.0,
            detection_prompt: None,
            detailed_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("padding_px", &self.padding_px)
            .field("verify_extra_padding_px", &self.verify_extra_padding_px)
            .field("merge_threshold", &self.merge_threshold)
            .field("max_regions", &self.max_regions)
            .field("line_tolerance", &self.line_tolerance)
            .field("premask", &self.premask)
            .field("strategy", &self.strategy)
            .field("inter_page_delay_ms", &self.inter_page_delay_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("temperature", &self.temperature)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PageProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn padding_px(mut self, px: u32) -> Self {
        self.config.padding_px = px;
        self
    }

    pub fn verify_extra_padding_px(mut self, px: u32) -> Self {
        self.config.verify_extra_padding_px = px;
        self
    }

    pub fn merge_threshold(mut self, t: f32) -> Self {
        self.config.merge_threshold = t;
        self
    }

    pub fn max_regions(mut self, n: usize) -> Self {
        self.config.max_regions = n.max(1);
        self
    }

    pub fn line_tolerance(mut self, t: f32) -> Self {
        self.config.line_tolerance = t.max(0.0);
        self
    }

    pub fn premask(mut self, v: bool) -> Self {
        self.config.premask = v;
        self
    }

    pub fn strategy(mut self, s: RecognitionStrategy) -> Self {
        self.config.strategy = s;
        self
    }

    pub fn inter_page_delay_ms(mut self, ms: u64) -> Self {
        self.config.inter_page_delay_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn detection_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.detection_prompt = Some(prompt.into());
        self
    }

    pub fn detailed_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.detailed_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, SlidewipeError> {
        let c = &self.config;
        if !c.merge_threshold.is_finite() || c.merge_threshold < 0.0 {
            return Err(SlidewipeError::InvalidConfig(format!(
                "merge_threshold must be a non-negative finite number, got {}",
                c.merge_threshold
            )));
        }
        if c.max_regions == 0 {
            return Err(SlidewipeError::InvalidConfig(
                "max_regions must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
