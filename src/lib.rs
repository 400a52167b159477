//! # slidewipe
//!
//! Remove overlaid text from scanned slide images using vision models.
//!
//! ## Why this crate?
//!
//! Rebuilding a slide deck from exported images requires the background art
//! without the text baked into it. Classical inpainting (OpenCV telea,
//! patch-match) smears gradients and destroys embedded artwork. Instead this
//! crate asks a vision model where the text is, consolidates the hits into a
//! handful of rectangular regions, pre-fills them with a locally sampled
//! background estimate, and lets an image-output model reconstruct what was
//! underneath.
//!
//! ## Pipeline Overview
//!
//! ```text
//! slide image
//!  │
//!  ├─ 1. Recognize    vision model returns text blocks with 0–1000 boxes
//!  ├─ 2. Consolidate  merge nearby boxes, pad, cap the region count
//!  ├─ 3. Pre-mask     local edge sampling → gradient/solid fill + feather
//!  ├─ 4. Reconstruct  image-output model inpaints the masked regions
//!  └─ 5. Verify       optional residue check with an extra retouch pass
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use slidewipe::{GeminiClient, Page, Pipeline, PipelineConfig, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder().padding_px(20).build()?;
//!     let client = GeminiClient::from_config(std::env::var("GEMINI_API_KEY")?, &config)?;
//!     let pipeline = Pipeline::new(Arc::new(client.clone()), Arc::new(client), config);
//!
//!     let image = image::open("slide-01.png")?;
//!     let pages = vec![Page::new(0, image)];
//!     let (pages, stats) = pipeline.run_batch(pages, &RunOptions::default()).await;
//!     println!("{} cleaned, {} failed", stats.completed, stats.failed);
//!     pages[0].working_image.save("slide-01.cleaned.png")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `slidewipe` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! slidewipe = { version = "0.3", default-features = false }
//! ```
//!
//! ## Bring your own models
//!
//! The pipeline talks to two narrow traits, [`RecognitionCapability`] and
//! [`ReconstructionCapability`]. [`GeminiClient`] implements both; any other
//! backend (or a test mock) plugs in the same way.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod capability;
pub mod config;
pub mod error;
pub mod gemini;
pub mod geometry;
pub mod page;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capability::{CapabilityError, RecognitionCapability, ReconstructionCapability};
pub use config::{PipelineConfig, PipelineConfigBuilder, RecognitionStrategy};
pub use error::{PageError, SlidewipeError};
pub use gemini::GeminiClient;
pub use geometry::NormBox;
pub use page::{BatchStats, BlockCategory, Page, PageDimensions, PageStatus, TextBlock, TextStyle};
pub use pipeline::consolidate::CleanupRegion;
pub use pipeline::recognize::RecognitionMode;
pub use progress::{NoopProgressCallback, PageProgressCallback, ProgressCallback};
pub use run::{Pipeline, RunOptions};
