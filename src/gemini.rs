//! Gemini-backed implementations of the capability traits.
//!
//! One `generateContent` client serves both capabilities: recognition calls a
//! text model with `response_mime_type: application/json` so the block list
//! comes back machine-parseable, and reconstruction calls an image-output
//! model and extracts the inline image part from the response.
//!
//! Error mapping at this boundary is deliberately coarse: any non-success
//! HTTP status becomes [`CapabilityError::Http`] and any connection-level
//! failure becomes [`CapabilityError::Transport`]. Whether a *successful*
//! response is usable is not this module's concern — the pipeline adapters
//! decide that (empty text is zero blocks, a response without an image part
//! is `Ok(None)`).

use crate::capability::{CapabilityError, RecognitionCapability, ReconstructionCapability};
use crate::config::PipelineConfig;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default text-capable model for recognition calls.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
/// Default image-output model for reconstruction calls.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    text_model: String,
    image_model: String,
    temperature: f32,
}

impl GeminiClient {
    /// Build a client with default models and a per-call timeout.
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, CapabilityError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CapabilityError::MissingApiKey);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Transport {
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            api_key,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            temperature: 0.0,
        })
    }

    /// Build a client from the API knobs of a [`PipelineConfig`]
    /// (`api_timeout_secs`, `temperature`).
    pub fn from_config(
        api_key: impl Into<String>,
        config: &PipelineConfig,
    ) -> Result<Self, CapabilityError> {
        Ok(Self::new(api_key, config.api_timeout_secs)?.with_temperature(config.temperature))
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t.clamp(0.0, 2.0);
        self
    }

    /// Lightweight connectivity and credential probe.
    ///
    /// A plausible key has the Google API prefix; the probe then issues a
    /// minimal text-only call against the recognition model.
    pub async fn validate_api_key(&self) -> bool {
        if !self.api_key.starts_with("AIza") {
            return false;
        }
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text("Reply with OK.")],
            }],
            generation_config: None,
        };
        self.post(&self.text_model, &request).await.is_ok()
    }

    async fn post(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, CapabilityError> {
        let url = format!("{API_BASE}/{model}:generateContent");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CapabilityError::Transport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Http {
                status: status.as_u16(),
                detail: truncate(&detail, 300),
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| CapabilityError::Transport {
                detail: format!("undecodable response body: {e}"),
            })
    }

    fn image_request(&self, prompt: &str, image_png: &[u8], json_output: bool) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(prompt),
                    Part::inline_png(BASE64_STANDARD.encode(image_png)),
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: self.temperature,
                response_mime_type: json_output.then(|| "application/json".to_string()),
            }),
        }
    }
}

#[async_trait]
impl RecognitionCapability for GeminiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        image_png: &[u8],
    ) -> Result<String, CapabilityError> {
        let request = self.image_request(prompt, image_png, true);
        let response = self.post(&self.text_model, &request).await?;
        let text = response.first_text().unwrap_or_default();
        debug!("Recognition response: {} chars", text.len());
        Ok(text)
    }
}

#[async_trait]
impl ReconstructionCapability for GeminiClient {
    async fn generate_image(
        &self,
        prompt: &str,
        image_png: &[u8],
    ) -> Result<Option<Vec<u8>>, CapabilityError> {
        let request = self.image_request(prompt, image_png, false);
        let response = self.post(&self.image_model, &request).await?;

        match response.first_image() {
            Some(b64) => {
                let bytes =
                    BASE64_STANDARD
                        .decode(b64)
                        .map_err(|e| CapabilityError::Transport {
                            detail: format!("undecodable inline image: {e}"),
                        })?;
                debug!("Reconstruction response: {} image bytes", bytes.len());
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(s: impl Into<String>) -> Self {
        Part {
            text: Some(s.into()),
            inline_data: None,
        }
    }

    fn inline_png(data_b64: String) -> Self {
        Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data: data_b64,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "inlineData", default)]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    #[serde(default)]
    data: String,
}

impl GenerateContentResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    fn first_text(&self) -> Option<String> {
        self.parts().find_map(|p| p.text.clone())
    }

    fn first_image(&self) -> Option<&str> {
        self.parts()
            .find_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            GeminiClient::new("", 30),
            Err(CapabilityError::MissingApiKey)
        ));
    }

    #[test]
    fn from_config_applies_timeout_and_temperature() {
        let config = PipelineConfig::builder()
            .api_timeout_secs(30)
            .temperature(0.7)
            .build()
            .unwrap();
        let client = GeminiClient::from_config("AIzaTest", &config).unwrap();
        assert_eq!(client.temperature, 0.7);
    }

    #[tokio::test]
    async fn foreign_key_prefix_is_rejected_before_any_request() {
        // Google keys start with "AIza"; anything else fails the format
        // check without touching the network.
        let client = GeminiClient::new("sk-wrong-vendor", 5).unwrap();
        assert!(!client.validate_api_key().await);
    }

    #[test]
    fn response_extracts_first_text_part() {
        let json = r#"{"candidates":[{"content":{"parts":[
            {"text":"[]"},
            {"inlineData":{"data":"aGk="}}
        ]}}]}"#;
        let r: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.first_text().as_deref(), Some("[]"));
        assert_eq!(r.first_image(), Some("aGk="));
    }

    #[test]
    fn imageless_response_yields_no_image() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"sorry"}]}}]}"#;
        let r: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(r.first_image().is_none());
    }

    #[test]
    fn empty_candidates_are_tolerated() {
        let r: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(r.first_text().is_none());
        assert!(r.first_image().is_none());
    }

    #[test]
    fn request_serializes_camel_case_wire_names() {
        let client = GeminiClient::new("AIzaTest", 30).unwrap();
        let req = client.image_request("find text", &[1, 2, 3], true);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"inlineData\""));
        assert!(json.contains("\"mimeType\":\"image/png\""));
        assert!(json.contains("\"responseMimeType\":\"application/json\""));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = truncate(s, 3);
        assert!(t.starts_with("h"));
        assert!(t.ends_with('…'));
        assert_eq!(truncate("short", 300), "short");
    }
}
