//! Region consolidation: raw text blocks → a minimal set of cleanup regions.
//!
//! Fragmented per-line detection boxes make poor inpainting targets — a
//! confetti of small masks gives the synthesis model dozens of seams to
//! blend. Merging nearby boxes into larger continuous regions, then padding
//! them, produces fewer and cleaner masks.
//!
//! The merge is a single top-to-bottom sweep after sorting: adjacency is only
//! checked against the most recently extended region. This is a deliberate
//! O(n log n) approximation rather than full clustering — it can under-merge
//! boxes that are adjacent but separated in sort order by an intervening box,
//! an accepted trade-off for responsiveness on interactive previews.

use crate::config::PipelineConfig;
use crate::geometry::{NormBox, NORM_SCALE};
use crate::page::{PageDimensions, TextBlock};
use tracing::debug;

/// A consolidated, padded box designated for background restoration.
///
/// Derived from the current block set on every pipeline run; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanupRegion {
    pub bounds: NormBox,
}

/// Build the ordered cleanup-region list for one reconstruction call.
///
/// Steps: filter blocks marked for removal, sort by `y_min` (ties by
/// `x_min`), sweep-merge with the configured threshold, expand by the
/// pixel padding converted to normalized units per axis, clamp, and truncate
/// to the region cap.
///
/// The padding conversion divides by page width/height independently, so
/// visually equal padding is only achieved on square pages.
pub fn consolidate_regions(
    blocks: &[TextBlock],
    dims: PageDimensions,
    padding_px: u32,
    config: &PipelineConfig,
) -> Vec<CleanupRegion> {
    let raw: Vec<NormBox> = blocks
        .iter()
        .filter(|b| b.is_removable())
        .map(|b| b.bounds)
        .collect();

    let merged = merge_boxes(&raw, config.merge_threshold);

    // Guard against degenerate dimensions; a 0-sized page never reaches the
    // pipeline but the arithmetic stays total.
    let safe_w = dims.width.max(1) as f32;
    let safe_h = dims.height.max(1) as f32;
    let pad_x = padding_px as f32 / safe_w * NORM_SCALE;
    let pad_y = padding_px as f32 / safe_h * NORM_SCALE;

    let mut regions: Vec<CleanupRegion> = merged
        .into_iter()
        .map(|b| CleanupRegion {
            bounds: b.expand(pad_x, pad_y),
        })
        .collect();

    if regions.len() > config.max_regions {
        debug!(
            "Truncating {} cleanup regions to cap {}",
            regions.len(),
            config.max_regions
        );
        regions.truncate(config.max_regions);
    }

    regions
}

/// Merge overlapping or nearby boxes with a single sorted sweep.
fn merge_boxes(boxes: &[NormBox], threshold: f32) -> Vec<NormBox> {
    if boxes.is_empty() {
        return Vec::new();
    }

    let mut sorted = boxes.to_vec();
    sorted.sort_by(|a, b| {
        a.y_min
            .total_cmp(&b.y_min)
            .then(a.x_min.total_cmp(&b.x_min))
    });

    let mut merged = Vec::new();
    let mut current = sorted[0];

    for next in &sorted[1..] {
        if current.intersects_or_near(next, threshold) {
            current = current.union(next);
        } else {
            merged.push(current);
            current = *next;
        }
    }
    merged.push(current);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{BlockCategory, TextBlock};

    fn square_page() -> PageDimensions {
        PageDimensions {
            width: 1000,
            height: 1000,
        }
    }

    fn removable(bounds: NormBox) -> TextBlock {
        TextBlock::new("t", bounds)
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn nearby_lines_merge_into_one_padded_region() {
        // Two lines with a 10-unit gap, threshold 15, padding 15px on a
        // 1000x1000 page (= 15 normalized units per axis).
        let blocks = vec![
            removable(NormBox::new(100.0, 100.0, 150.0, 400.0)),
            removable(NormBox::new(160.0, 100.0, 210.0, 400.0)),
        ];
        let regions = consolidate_regions(&blocks, square_page(), 15, &config());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bounds, NormBox::new(85.0, 85.0, 225.0, 415.0));
    }

    #[test]
    fn excluded_blocks_are_filtered() {
        let mut art = removable(NormBox::new(100.0, 100.0, 150.0, 400.0));
        art.category = BlockCategory::EmbeddedArtText;
        let mut opted_out = removable(NormBox::new(500.0, 100.0, 550.0, 400.0));
        opted_out.included = Some(false);

        let regions = consolidate_regions(&[art, opted_out], square_page(), 0, &config());
        assert!(regions.is_empty());
    }

    #[test]
    fn merge_is_idempotent() {
        let boxes = vec![
            NormBox::new(100.0, 100.0, 150.0, 400.0),
            NormBox::new(160.0, 100.0, 210.0, 400.0),
            NormBox::new(600.0, 100.0, 650.0, 400.0),
        ];
        let once = merge_boxes(&boxes, 15.0);
        let twice = merge_boxes(&once, 15.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_never_shrinks_coverage() {
        let boxes = vec![
            NormBox::new(10.0, 10.0, 50.0, 300.0),
            NormBox::new(55.0, 20.0, 90.0, 310.0),
            NormBox::new(400.0, 400.0, 450.0, 600.0),
            NormBox::new(405.0, 390.0, 460.0, 610.0),
        ];
        let merged = merge_boxes(&boxes, 15.0);
        for b in &boxes {
            assert!(
                merged.iter().any(|m| m.contains(b)),
                "box {b:?} not covered by any merged region"
            );
        }
    }

    #[test]
    fn padding_is_symmetric_on_square_pages() {
        let blocks = vec![removable(NormBox::new(400.0, 400.0, 500.0, 500.0))];
        let regions = consolidate_regions(&blocks, square_page(), 10, &config());
        let b = regions[0].bounds;
        // 10px on a 1000px axis is exactly 10 normalized units each side.
        assert_eq!(b, NormBox::new(390.0, 390.0, 510.0, 510.0));
    }

    #[test]
    fn padding_is_per_axis_on_non_square_pages() {
        let dims = PageDimensions {
            width: 2000,
            height: 1000,
        };
        let blocks = vec![removable(NormBox::new(400.0, 400.0, 500.0, 500.0))];
        let regions = consolidate_regions(&blocks, dims, 10, &config());
        let b = regions[0].bounds;
        // 10px is 5 normalized units horizontally but 10 vertically.
        assert_eq!(b, NormBox::new(390.0, 395.0, 510.0, 505.0));
    }

    #[test]
    fn region_count_is_capped() {
        let cfg = PipelineConfig::builder().max_regions(3).build().unwrap();
        let blocks: Vec<TextBlock> = (0..10)
            .map(|i| {
                let y = i as f32 * 100.0;
                removable(NormBox::new(y, 0.0, y + 20.0, 100.0))
            })
            .collect();
        let regions = consolidate_regions(&blocks, square_page(), 0, &cfg);
        assert_eq!(regions.len(), 3);
        // Truncation drops the later regions, keeping detection order.
        assert_eq!(regions[0].bounds.y_min, 0.0);
    }

    #[test]
    fn empty_input_produces_no_regions() {
        let regions = consolidate_regions(&[], square_page(), 20, &config());
        assert!(regions.is_empty());
    }
}
