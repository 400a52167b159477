//! Prompts sent to the recognition and reconstruction capabilities.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tightening the detection rules or the
//!    inpainting constraints requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the exact instruction a region
//!    list produces without calling a real model.
//!
//! Callers can override the recognition and inpainting prompts via
//! [`crate::config::PipelineConfig`]; the constants here are used when no
//! override is provided.

use crate::geometry::NormBox;
use crate::page::TextBlock;
use std::fmt::Write as _;

/// Geometry-only detection prompt.
///
/// Used for the first pass of the two-call strategy and for the SIMPLE
/// verification mode. Priority is recall: find every overlay text region,
/// ignore style entirely.
pub const DETECTION_PROMPT: &str = r#"Analyze this slide image and locate ALL overlay text blocks.
For each block return:
1. "text": the literal string content.
2. "box_2d": [ymin, xmin, ymax, xmax], coordinates normalized to 0-1000 against page height/width.

Find every piece of text, including small captions and labels. Do not describe styling.
Return strictly a valid JSON array of objects with exactly those two fields."#;

/// Full one-call detailed prompt: geometry plus styling and classification.
pub const DETAILED_PROMPT: &str = r##"Analyze this slide image and extract ALL overlay text blocks.
For each block return:
1. "text": the literal string content.
2. "box_2d": [ymin, xmin, ymax, xmax], coordinates normalized to 0-1000 against page height/width.
3. "font_size": estimated cap height, 0-1000 normalized to page height.
4. "is_bold": true/false.
5. "italic": true/false.
6. "color": hex code, e.g. "#FFFFFF".
7. "align": "left", "center", or "right".
8. "category": "presentation_text" for titles/body content that should be removed from the
   background, "embedded_art_text" for text that is part of a logo or illustration.

Return strictly a valid JSON array of objects."##;

/// Build the style-enrichment prompt for the second pass of the two-call
/// strategy. The detected geometries are re-submitted so the model only has
/// to fill in styling and classification for known boxes.
pub fn enrichment_prompt(blocks: &[TextBlock]) -> String {
    let geometry = serde_json::to_string(
        &blocks
            .iter()
            .map(|b| serde_json::json!({ "text": b.text, "box_2d": b.bounds }))
            .collect::<Vec<_>>(),
    )
    .unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"The following text blocks were already detected on this slide image:

{geometry}

For EACH block above, analyze its visual styling on the image and return the block again with:
"text", "box_2d" (unchanged), "font_size" (0-1000 of page height), "is_bold", "italic",
"color" (hex), "align" ("left"/"center"/"right"), and "category" ("presentation_text" or
"embedded_art_text" for text baked into a logo or illustration).

Return strictly a valid JSON array with one object per input block, same order."#
    )
}

/// Instruction header for reconstruction when the input was pre-masked by the
/// local synthesizer: the regions are already covered by feathered
/// approximate fills and the model's job is to dissolve them seamlessly.
const INPAINT_PREMASKED_HEADER: &str = r#"The input image has been pre-processed: the listed regions are covered by soft-edged
masks approximating the background color. Perform seamless inpainting to perfectly
restore the background behind these masks.

Instructions:
1. Blend the softened mask edges into the surrounding background; eliminate all
   rectangular artifacts, seams, and color discontinuities.
2. If a background line, gradient, texture, or pattern enters a masked area, continue
   it naturally. Do NOT just blur; reconstruct the underlying structure.
3. Remove any residual text fragments, glow, or anti-aliasing near the mask edges."#;

/// Instruction header for reconstruction directly on the raw page image.
const INPAINT_RAW_HEADER: &str = r#"Remove all text inside the listed regions of this slide image and seamlessly restore
the background behind it.

Instructions:
1. Erase the text completely, including shadows, glow, and anti-aliasing halos.
2. Continue any background line, gradient, texture, or pattern that crosses a region.
   Do NOT just blur; reconstruct the underlying structure."#;

const INPAINT_CONSTRAINTS: &str = r#"
Strict constraints:
- PRESERVE all diagrams, icons, and illustrations outside the listed regions, and any
  non-text artwork inside them.
- Do NOT add new objects, text, or watermarks.
- Maintain the original resolution and aspect ratio.

Return ONLY the fully restored image."#;

/// Build the inpainting prompt for a set of cleanup regions.
///
/// `premasked` selects the instruction set matching whether the local mask
/// pass already ran on the submitted image.
pub fn inpainting_prompt(regions: &[NormBox], premasked: bool) -> String {
    let header = if premasked {
        INPAINT_PREMASKED_HEADER
    } else {
        INPAINT_RAW_HEADER
    };

    let mut out = String::with_capacity(header.len() + 64 * regions.len());
    out.push_str(header);
    out.push_str("\n\nRegions to restore, as [ymin, xmin, ymax, xmax] normalized to 0-1000:\n");
    if regions.is_empty() {
        out.push_str("(none — return the image unchanged)\n");
    }
    for r in regions {
        let _ = writeln!(
            out,
            "- [{:.0}, {:.0}, {:.0}, {:.0}]",
            r.y_min, r.x_min, r.y_max, r.x_max
        );
    }
    out.push_str(INPAINT_CONSTRAINTS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormBox;

    #[test]
    fn inpainting_prompt_lists_every_region() {
        let regions = [
            NormBox::new(85.0, 85.0, 225.0, 415.0),
            NormBox::new(500.0, 0.0, 600.0, 1000.0),
        ];
        let p = inpainting_prompt(&regions, true);
        assert!(p.contains("[85, 85, 225, 415]"));
        assert!(p.contains("[500, 0, 600, 1000]"));
        assert!(p.contains("pre-processed"));
    }

    #[test]
    fn inpainting_prompt_handles_empty_region_list() {
        let p = inpainting_prompt(&[], false);
        assert!(p.contains("return the image unchanged"));
        assert!(!p.contains("pre-processed"));
    }

    #[test]
    fn enrichment_prompt_embeds_detected_geometry() {
        let blocks = vec![TextBlock::new(
            "Title",
            NormBox::new(10.0, 20.0, 30.0, 40.0),
        )];
        let p = enrichment_prompt(&blocks);
        assert!(p.contains("\"Title\""));
        assert!(p.contains("[10.0,20.0,30.0,40.0]"));
    }
}
