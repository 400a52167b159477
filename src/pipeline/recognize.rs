//! Recognition adapter: drive the text-recognition capability and normalize
//! its output.
//!
//! The capability's responses are loosely shaped — JSON arrays of blocks that
//! may arrive wrapped in markdown fences, with missing fields, malformed
//! boxes, or nothing at all. This module owns the boundary: responses are
//! parsed into a validated block list or degraded to "no text found", never
//! trusted further in. A page with zero text is valid; only transport-level
//! failures propagate as errors.
//!
//! Two call strategies produce the same contract. `OneCall` asks for geometry
//! and styling together; `TwoCall` first runs a high-recall geometry pass and
//! then re-submits the detected boxes for style enrichment — better recall on
//! dense layouts at the cost of a second round-trip. In both cases every
//! block is stamped with its inclusion default and the list is sorted into
//! reading order before it leaves this module.

use crate::capability::{CapabilityError, RecognitionCapability};
use crate::config::{PipelineConfig, RecognitionStrategy};
use crate::geometry::{NormBox, NORM_SCALE};
use crate::page::{Alignment, BlockCategory, TextBlock, TextStyle};
use crate::prompts;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the recognition call is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Geometry only. Used for the verification pass, where style is
    /// irrelevant.
    Simple,
    /// Full styling and classification.
    Detailed,
}

/// Wire shape of one block as emitted by the capability.
///
/// Everything beyond `text` and `box_2d` is optional; absent style fields
/// get defaults downstream.
#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(default)]
    text: String,
    #[serde(default)]
    box_2d: Vec<f32>,
    #[serde(default)]
    font_size: Option<f32>,
    #[serde(default)]
    is_bold: Option<bool>,
    #[serde(default)]
    italic: Option<bool>,
    #[serde(default)]
    align: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Recognition adapter over a capability.
pub struct RecognitionAdapter {
    capability: Arc<dyn RecognitionCapability>,
}

impl RecognitionAdapter {
    pub fn new(capability: Arc<dyn RecognitionCapability>) -> Self {
        Self { capability }
    }

    /// Detect text blocks on a page image.
    ///
    /// Returns the blocks in reading order with `included` stamped from the
    /// category. Malformed or empty capability output yields `Ok(vec![])`;
    /// only transport failures are `Err`.
    pub async fn recognize(
        &self,
        image_png: &[u8],
        mode: RecognitionMode,
        config: &PipelineConfig,
    ) -> Result<Vec<TextBlock>, CapabilityError> {
        let mut blocks = match (mode, config.strategy) {
            (RecognitionMode::Simple, _) => self.geometry_pass(image_png, config).await?,
            (RecognitionMode::Detailed, RecognitionStrategy::OneCall) => {
                let prompt = config
                    .detailed_prompt
                    .as_deref()
                    .unwrap_or(prompts::DETAILED_PROMPT);
                let response = self.capability.generate_text(prompt, image_png).await?;
                parse_blocks(&response)
            }
            (RecognitionMode::Detailed, RecognitionStrategy::TwoCall) => {
                let basic = self.geometry_pass(image_png, config).await?;
                if basic.is_empty() {
                    basic
                } else {
                    self.enrichment_pass(image_png, basic).await
                }
            }
        };

        for block in &mut blocks {
            block.included = Some(block.category == BlockCategory::PresentationText);
        }
        sort_reading_order(&mut blocks, config.line_tolerance);

        debug!("Recognition produced {} blocks ({mode:?})", blocks.len());
        Ok(blocks)
    }

    async fn geometry_pass(
        &self,
        image_png: &[u8],
        config: &PipelineConfig,
    ) -> Result<Vec<TextBlock>, CapabilityError> {
        let prompt = config
            .detection_prompt
            .as_deref()
            .unwrap_or(prompts::DETECTION_PROMPT);
        let response = self.capability.generate_text(prompt, image_png).await?;
        Ok(parse_blocks(&response))
    }

    /// Re-submit detected geometries for style enrichment.
    ///
    /// Any enrichment failure — transport or unusable payload — falls back to
    /// the geometry-only blocks: a detected page must never get worse because
    /// the optional second pass misbehaved.
    async fn enrichment_pass(&self, image_png: &[u8], basic: Vec<TextBlock>) -> Vec<TextBlock> {
        let prompt = prompts::enrichment_prompt(&basic);
        match self.capability.generate_text(&prompt, image_png).await {
            Ok(response) => {
                let enriched = parse_blocks(&response);
                if enriched.is_empty() {
                    warn!("Style enrichment returned no usable blocks; keeping geometry pass");
                    basic
                } else {
                    enriched
                }
            }
            Err(e) => {
                warn!("Style enrichment failed ({e}); keeping geometry pass");
                basic
            }
        }
    }
}

static RE_JSON_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Strip markdown fences the model sometimes wraps its JSON in.
fn strip_fences(response: &str) -> &str {
    let trimmed = response.trim();
    match RE_JSON_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    }
}

/// Parse and validate a capability response into text blocks.
///
/// Malformed JSON, a non-array payload, or an empty array all yield an empty
/// list. Individual blocks with an unusable box are dropped; the survivors
/// have their coordinates clamped to the normalized scale.
fn parse_blocks(response: &str) -> Vec<TextBlock> {
    let payload = strip_fences(response);
    let raw: Vec<RawBlock> = match serde_json::from_str(payload) {
        Ok(blocks) => blocks,
        Err(e) => {
            warn!("Unparseable recognition payload treated as zero blocks: {e}");
            return Vec::new();
        }
    };

    raw.into_iter().filter_map(validate_block).collect()
}

fn validate_block(raw: RawBlock) -> Option<TextBlock> {
    if raw.box_2d.len() != 4 {
        warn!("Dropping block with {}-element box", raw.box_2d.len());
        return None;
    }
    let clamp = |v: f32| v.clamp(0.0, NORM_SCALE);
    let bounds = NormBox::new(
        clamp(raw.box_2d[0]),
        clamp(raw.box_2d[1]),
        clamp(raw.box_2d[2]),
        clamp(raw.box_2d[3]),
    );
    if bounds.y_min >= bounds.y_max || bounds.x_min >= bounds.x_max {
        warn!("Dropping block with inverted box {bounds:?}");
        return None;
    }

    let category = match raw.category.as_deref() {
        Some("embedded_art_text") => BlockCategory::EmbeddedArtText,
        _ => BlockCategory::PresentationText,
    };
    let align = match raw.align.as_deref() {
        Some("center") => Alignment::Center,
        Some("right") => Alignment::Right,
        _ => Alignment::Left,
    };

    Some(TextBlock {
        text: raw.text,
        bounds,
        font_size: raw.font_size,
        style: TextStyle {
            bold: raw.is_bold.unwrap_or(false),
            italic: raw.italic.unwrap_or(false),
            align,
            color: raw.color,
        },
        category,
        included: None,
    })
}

/// Sort blocks into reading order: top-to-bottom with a same-line tolerance
/// band, left-to-right within a line.
///
/// A plain `(y, x)` comparator would order two blocks on the same visual line
/// by their slightly different `y_min` values; grouping lines first keeps
/// columns of a title row in left-to-right order.
pub fn sort_reading_order(blocks: &mut [TextBlock], line_tolerance: f32) {
    blocks.sort_by(|a, b| a.bounds.y_min.total_cmp(&b.bounds.y_min));

    let mut start = 0;
    while start < blocks.len() {
        let line_y = blocks[start].bounds.y_min;
        let mut end = start + 1;
        while end < blocks.len() && (blocks[end].bounds.y_min - line_y).abs() < line_tolerance {
            end += 1;
        }
        blocks[start..end].sort_by(|a, b| a.bounds.x_min.total_cmp(&b.bounds.x_min));
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_at(y: f32, x: f32) -> TextBlock {
        TextBlock::new(format!("{y}/{x}"), NormBox::new(y, x, y + 30.0, x + 100.0))
    }

    #[test]
    fn parses_plain_json_array() {
        let blocks = parse_blocks(r#"[{"text":"Hi","box_2d":[10,20,40,200]}]"#);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Hi");
        assert_eq!(blocks[0].bounds, NormBox::new(10.0, 20.0, 40.0, 200.0));
    }

    #[test]
    fn strips_markdown_fences() {
        let fenced = "```json\n[{\"text\":\"Hi\",\"box_2d\":[10,20,40,200]}]\n```";
        assert_eq!(parse_blocks(fenced).len(), 1);
    }

    #[test]
    fn malformed_payload_is_zero_blocks() {
        assert!(parse_blocks("I could not find any text.").is_empty());
        assert!(parse_blocks("{\"not\":\"an array\"}").is_empty());
        assert!(parse_blocks("[]").is_empty());
    }

    #[test]
    fn invalid_boxes_are_dropped_valid_ones_kept() {
        let blocks = parse_blocks(
            r#"[
                {"text":"bad","box_2d":[40,20,10,200]},
                {"text":"short","box_2d":[1,2,3]},
                {"text":"good","box_2d":[10,20,40,200]}
            ]"#,
        );
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "good");
    }

    #[test]
    fn out_of_scale_coordinates_are_clamped() {
        let blocks = parse_blocks(r#"[{"text":"x","box_2d":[-5,0,40,1200]}]"#);
        assert_eq!(blocks[0].bounds, NormBox::new(0.0, 0.0, 40.0, 1000.0));
    }

    #[test]
    fn style_and_category_are_honored() {
        let blocks = parse_blocks(
            r##"[{"text":"logo","box_2d":[10,20,40,200],"is_bold":true,"italic":true,
                "align":"center","color":"#FF0000","font_size":28,
                "category":"embedded_art_text"}]"##,
        );
        let b = &blocks[0];
        assert!(b.style.bold && b.style.italic);
        assert_eq!(b.style.align, Alignment::Center);
        assert_eq!(b.style.color.as_deref(), Some("#FF0000"));
        assert_eq!(b.category, BlockCategory::EmbeddedArtText);
        assert_eq!(b.font_size, Some(28.0));
    }

    #[test]
    fn reading_order_groups_same_line_by_tolerance() {
        // Three blocks: two on one visual line (y 100 and 110), one below.
        let mut blocks = vec![block_at(110.0, 50.0), block_at(300.0, 0.0), block_at(100.0, 600.0)];
        sort_reading_order(&mut blocks, 20.0);
        let order: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        // Same line sorts by x even though 110 < 100 is false on y.
        assert_eq!(order, vec!["110/50", "100/600", "300/0"]);
    }

    #[test]
    fn reading_order_without_tolerance_is_pure_y_sort() {
        let mut blocks = vec![block_at(110.0, 50.0), block_at(100.0, 600.0)];
        sort_reading_order(&mut blocks, 0.0);
        assert_eq!(blocks[0].text, "100/600");
    }
}
