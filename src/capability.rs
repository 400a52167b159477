//! External capability interfaces.
//!
//! The pipeline delegates the two genuinely hard perception problems — text
//! recognition and background synthesis — to external capabilities behind
//! object-safe async traits. The traits are deliberately model-shaped rather
//! than domain-shaped: they take a prompt and raw PNG bytes and return text
//! or an image. Everything domain-specific (prompt construction, response
//! validation, reading-order normalization, region formatting) lives in the
//! adapters under [`crate::pipeline`], so a mock capability in tests is a
//! few lines of canned strings.
//!
//! Responses are loosely specified by the capabilities and are never trusted
//! past the adapter boundary: the recognition adapter parses them into a
//! validated block list or treats them as "no text found".

use async_trait::async_trait;
use thiserror::Error;

/// Transport-level failure talking to a capability.
///
/// These are fatal to the pipeline stage that made the call. A reachable
/// capability that returns unusable content is NOT a `CapabilityError` —
/// empty recognition output means zero blocks, and an imageless
/// reconstruction response is `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    /// No API key was configured for the capability.
    #[error("No API key configured. Set GEMINI_API_KEY.")]
    MissingApiKey,

    /// The capability rejected the request.
    #[error("Capability returned HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The capability was unreachable (DNS, TLS, timeout, connection reset).
    #[error("Capability unreachable: {detail}")]
    Transport { detail: String },
}

/// A capability that reads an image and answers with text.
///
/// Used for both the detailed recognition pass on the original page and the
/// SIMPLE verification pass on an already-cleaned image — implementations
/// must tolerate being asked to re-detect text on an image that has none.
#[async_trait]
pub trait RecognitionCapability: Send + Sync {
    /// Submit `image_png` with `prompt` and return the raw text response.
    async fn generate_text(
        &self,
        prompt: &str,
        image_png: &[u8],
    ) -> Result<String, CapabilityError>;
}

/// A capability that repaints an image.
///
/// Must preserve the resolution and aspect ratio of the input and must not
/// introduce new content. Returns `Ok(None)` when the capability responds
/// without producing an image — distinct from a transport failure.
#[async_trait]
pub trait ReconstructionCapability: Send + Sync {
    /// Submit `image_png` with `prompt` and return the repainted image bytes.
    async fn generate_image(
        &self,
        prompt: &str,
        image_png: &[u8],
    ) -> Result<Option<Vec<u8>>, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_carries_status() {
        let e = CapabilityError::Http {
            status: 429,
            detail: "quota".into(),
        };
        assert!(e.to_string().contains("429"));
    }

    #[test]
    fn missing_key_mentions_env_var() {
        assert!(CapabilityError::MissingApiKey
            .to_string()
            .contains("GEMINI_API_KEY"));
    }
}
