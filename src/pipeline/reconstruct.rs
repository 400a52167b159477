//! Reconstruction adapter: ask the image-synthesis capability to restore the
//! background inside the cleanup regions.
//!
//! This module is intentionally thin — all instruction engineering lives in
//! [`crate::prompts`] and all region reasoning in
//! [`crate::pipeline::consolidate`], so this stage only formats the request
//! and distinguishes the three outcomes: a new image, an imageless response
//! (`Ok(None)`, the capability answered but produced nothing), and a
//! transport failure.

use super::consolidate::CleanupRegion;
use crate::capability::{CapabilityError, ReconstructionCapability};
use crate::geometry::NormBox;
use crate::prompts;
use std::sync::Arc;
use tracing::debug;

/// Reconstruction adapter over a capability.
pub struct ReconstructionAdapter {
    capability: Arc<dyn ReconstructionCapability>,
}

impl ReconstructionAdapter {
    pub fn new(capability: Arc<dyn ReconstructionCapability>) -> Self {
        Self { capability }
    }

    /// Request a seamless background restoration of `regions` on `image_png`.
    ///
    /// `premasked` tells the capability whether the local mask pass already
    /// covered the regions with approximate fills. The region list may be
    /// empty — the call is still made and a capability that no-ops on it is
    /// expected to return the input unchanged.
    pub async fn reconstruct(
        &self,
        image_png: &[u8],
        regions: &[CleanupRegion],
        premasked: bool,
    ) -> Result<Option<Vec<u8>>, CapabilityError> {
        let boxes: Vec<NormBox> = regions.iter().map(|r| r.bounds).collect();
        let prompt = prompts::inpainting_prompt(&boxes, premasked);
        debug!(
            "Requesting reconstruction of {} regions (premasked: {premasked})",
            boxes.len()
        );
        self.capability.generate_image(&prompt, image_png).await
    }
}
