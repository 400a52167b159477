//! Page and text-block data model.
//!
//! A [`Page`] is the unit of work: one raster image plus the text blocks
//! detected on it and the pipeline status. The pipeline receives a page by
//! value, drives it to a terminal status, and returns it — it never holds a
//! page across invocations, and the caller is solely responsible for
//! installing the returned page back into its collection. This explicit
//! ownership replaces the shared-mutable-array style the problem is usually
//! written in.

use crate::error::{PageError, SlidewipeError};
use crate::geometry::NormBox;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Whether a detected block is slide content or part of embedded artwork.
///
/// Presentation text is removed from the background and re-typeset; text
/// baked into a logo or illustration is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    #[default]
    PresentationText,
    EmbeddedArtText,
}

/// Horizontal alignment of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Visual styling recognised for a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub align: Alignment,
    /// Hex color string, e.g. `#FFFFFF`.
    pub color: Option<String>,
}

/// A detected or user-edited text region.
///
/// Created by the recognition adapter; may be mutated by an external editor
/// (box move/resize, inclusion toggle); consumed, never mutated, by the
/// consolidator and the reconstruction adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognized string content.
    pub text: String,
    /// Position on the 0–1000 normalized scale, `[yMin, xMin, yMax, xMax]`.
    pub bounds: NormBox,
    /// Relative cap-height on the same 0–1000 vertical scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default)]
    pub category: BlockCategory,
    /// Explicit cleanup override. `Some(_)` takes precedence over `category`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<bool>,
}

impl TextBlock {
    /// Create a geometry-only block with default styling.
    pub fn new(text: impl Into<String>, bounds: NormBox) -> Self {
        Self {
            text: text.into(),
            bounds,
            font_size: None,
            style: TextStyle::default(),
            category: BlockCategory::default(),
            included: None,
        }
    }

    /// Whether the block participates in background cleanup.
    ///
    /// The explicit `included` override wins; otherwise presentation text is
    /// removable and embedded-art text is not.
    pub fn is_removable(&self) -> bool {
        self.included
            .unwrap_or(self.category == BlockCategory::PresentationText)
    }
}

/// Pipeline state of a page.
///
/// `Rendering` is only ever set by an external rasterizer when the source
/// resolution changes; this pipeline never enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageStatus {
    #[default]
    Idle,
    Rendering,
    Analyzing,
    Cleaning,
    Verifying,
    Done,
    Error,
}

impl PageStatus {
    /// Terminal states end a pipeline invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PageStatus::Done | PageStatus::Error)
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageStatus::Idle => "IDLE",
            PageStatus::Rendering => "RENDERING",
            PageStatus::Analyzing => "ANALYZING",
            PageStatus::Cleaning => "CLEANING",
            PageStatus::Verifying => "VERIFYING",
            PageStatus::Done => "DONE",
            PageStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Pixel dimensions of the source raster, fixed at ingestion.
///
/// All normalized coordinates on the page are interpreted against these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: u32,
    pub height: u32,
}

/// One page of a job.
#[derive(Debug, Clone)]
pub struct Page {
    /// Index within the job.
    pub id: usize,
    /// Immutable raster source, set once at ingestion.
    pub original_image: DynamicImage,
    /// Current best background. Starts equal to `original_image` and is
    /// overwritten by each successful reconstruction pass.
    pub working_image: DynamicImage,
    /// Detected/edited blocks in reading order.
    pub blocks: Vec<TextBlock>,
    /// Pristine recognition result, kept so an editor can revert edits.
    pub baseline_blocks: Vec<TextBlock>,
    pub status: PageStatus,
    pub dimensions: PageDimensions,
    /// Page-level override of the job-level cleanup padding, in pixels.
    pub padding_px: Option<u32>,
    /// Diagnostic from the most recent failed invocation, if any.
    pub last_error: Option<PageError>,
}

impl Page {
    /// Create a fresh page from its source raster.
    pub fn new(id: usize, image: DynamicImage) -> Self {
        let dimensions = PageDimensions {
            width: image.width(),
            height: image.height(),
        };
        Self {
            id,
            working_image: image.clone(),
            original_image: image,
            blocks: Vec::new(),
            baseline_blocks: Vec::new(),
            status: PageStatus::Idle,
            dimensions,
            padding_px: None,
            last_error: None,
        }
    }

    /// Load a page from an image file on disk.
    pub fn from_path(id: usize, path: impl AsRef<Path>) -> Result<Self, SlidewipeError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| SlidewipeError::ImageLoadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Ok(Self::new(id, image))
    }

    /// Write the current working image to disk. Format follows the file
    /// extension.
    pub fn save_working(&self, path: impl AsRef<Path>) -> Result<(), SlidewipeError> {
        let path = path.as_ref();
        self.working_image
            .save(path)
            .map_err(|e| SlidewipeError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: match e {
                    image::ImageError::IoError(io) => io,
                    other => std::io::Error::other(other.to_string()),
                },
            })
    }

    /// Revert block edits to the pristine recognition result.
    pub fn reset_blocks(&mut self) {
        self.blocks = self.baseline_blocks.clone();
    }

    /// Blocks currently marked for removal.
    pub fn removable_blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter(|b| b.is_removable())
    }
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Pages the driver attempted.
    pub total: usize,
    /// Pages that reached `DONE`.
    pub completed: usize,
    /// Pages that reached `ERROR`.
    pub failed: usize,
    /// Wall-clock duration of the whole batch.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(category: BlockCategory, included: Option<bool>) -> TextBlock {
        TextBlock {
            category,
            included,
            ..TextBlock::new("x", NormBox::new(0.0, 0.0, 10.0, 10.0))
        }
    }

    #[test]
    fn included_override_beats_category() {
        assert!(!block(BlockCategory::PresentationText, Some(false)).is_removable());
        assert!(block(BlockCategory::EmbeddedArtText, Some(true)).is_removable());
    }

    #[test]
    fn category_decides_when_no_override() {
        assert!(block(BlockCategory::PresentationText, None).is_removable());
        assert!(!block(BlockCategory::EmbeddedArtText, None).is_removable());
    }

    #[test]
    fn new_page_starts_idle_with_matching_images() {
        let img = DynamicImage::new_rgba8(64, 32);
        let page = Page::new(0, img);
        assert_eq!(page.status, PageStatus::Idle);
        assert_eq!(page.dimensions.width, 64);
        assert_eq!(page.dimensions.height, 32);
        assert_eq!(page.working_image.width(), page.original_image.width());
    }

    #[test]
    fn reset_blocks_restores_baseline() {
        let mut page = Page::new(0, DynamicImage::new_rgba8(8, 8));
        let original = vec![block(BlockCategory::PresentationText, None)];
        page.blocks = original.clone();
        page.baseline_blocks = original.clone();
        page.blocks[0].included = Some(false);
        page.reset_blocks();
        assert_eq!(page.blocks, original);
    }

    #[test]
    fn terminal_states() {
        assert!(PageStatus::Done.is_terminal());
        assert!(PageStatus::Error.is_terminal());
        assert!(!PageStatus::Cleaning.is_terminal());
    }

    #[test]
    fn removable_blocks_applies_per_block_resolution() {
        let mut page = Page::new(0, DynamicImage::new_rgba8(8, 8));
        page.blocks = vec![
            block(BlockCategory::PresentationText, None),
            block(BlockCategory::EmbeddedArtText, None),
            block(BlockCategory::EmbeddedArtText, Some(true)),
            block(BlockCategory::PresentationText, Some(false)),
        ];
        assert_eq!(page.removable_blocks().count(), 2);
    }

    #[test]
    fn page_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        let page = Page::new(0, DynamicImage::new_rgb8(40, 30));
        page.save_working(&path).unwrap();

        let loaded = Page::from_path(7, &path).unwrap();
        assert_eq!(loaded.id, 7);
        assert_eq!(loaded.dimensions.width, 40);
        assert_eq!(loaded.dimensions.height, 30);
        assert_eq!(loaded.status, PageStatus::Idle);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = Page::from_path(0, "/nonexistent/none.png").unwrap_err();
        assert!(matches!(err, SlidewipeError::ImageLoadFailed { .. }));
    }

    #[test]
    fn status_display_matches_wire_names() {
        assert_eq!(PageStatus::Analyzing.to_string(), "ANALYZING");
        assert_eq!(
            serde_json::to_string(&PageStatus::Verifying).unwrap(),
            "\"VERIFYING\""
        );
    }
}
