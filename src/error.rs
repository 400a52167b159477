//! Error types for the slidewipe library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SlidewipeError`] — **Fatal**: the run cannot proceed at all (invalid
//!   configuration, unreadable input image, output write failure). Returned as
//!   `Err(SlidewipeError)` from top-level entry points.
//!
//! * [`PageError`] — **Non-fatal to the batch**: one page's pipeline failed
//!   (recognition transport error, reconstruction returned nothing) but
//!   sibling pages are fine. Stored on [`crate::page::Page::last_error`] so a
//!   page in `Error` status keeps its diagnostic and its last good
//!   image/blocks for inspection and re-triggering.
//!
//! A third tier lives at the capability boundary:
//! [`crate::capability::CapabilityError`] classifies transport-level failures
//! before the pipeline converts them into a `PageError`. Verification-pass
//! failures never become errors at all — they downgrade to "skip second pass"
//! with a warning.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the slidewipe library.
///
/// Page-level failures use [`PageError`] and are stored on the page rather
/// than propagated here.
#[derive(Debug, Error)]
pub enum SlidewipeError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input image could not be read or decoded.
    #[error("Failed to load image '{path}': {detail}")]
    ImageLoadFailed { path: PathBuf, detail: String },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A non-fatal error for a single page.
///
/// The page that produced it moves to [`crate::page::PageStatus::Error`];
/// the batch driver continues with the next page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The recognition capability was unreachable or rejected the call.
    /// Malformed or empty recognition output is NOT an error — a page with
    /// no text is valid.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// The reconstruction capability was unreachable or rejected the call.
    #[error("Page {page}: reconstruction failed: {detail}")]
    ReconstructionFailed { page: usize, detail: String },

    /// Reconstruction answered without producing an image. Equivalent to a
    /// transport failure for the cleaning stage: no background means the
    /// stage did not accomplish its purpose.
    #[error("Page {page}: reconstruction returned no image")]
    ReconstructionEmpty { page: usize },

    /// Reconstruction returned bytes that do not decode as an image.
    #[error("Page {page}: reconstructed image is not decodable: {detail}")]
    InvalidImage { page: usize, detail: String },
}

impl PageError {
    /// The page index this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RecognitionFailed { page, .. }
            | PageError::ReconstructionFailed { page, .. }
            | PageError::ReconstructionEmpty { page }
            | PageError::InvalidImage { page, .. } => *page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_error_display_names_the_page() {
        let e = PageError::ReconstructionEmpty { page: 4 };
        assert!(e.to_string().contains("Page 4"));
        assert_eq!(e.page(), 4);
    }

    #[test]
    fn recognition_failure_carries_detail() {
        let e = PageError::RecognitionFailed {
            page: 1,
            detail: "401 Unauthorized".into(),
        };
        assert!(e.to_string().contains("401"));
    }

    #[test]
    fn invalid_config_display() {
        let e = SlidewipeError::InvalidConfig("merge threshold must be finite".into());
        assert!(e.to_string().contains("merge threshold"));
    }
}
