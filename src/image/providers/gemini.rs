//! Gemini (Google) image editing provider.

use crate::error::{parse_retry_after, sanitize_error_message, MirageError, Result};
use crate::image::provider::ImageEditor;
use crate::image::types::{
    GeneratedResult, GenerationRequest, InlineImage, DEFAULT_IMAGE_MIME,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API root (e.g. a proxy).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets a whole-request timeout. None by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                MirageError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        let mut client = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        Ok(GeminiProvider {
            client: client.build()?,
            api_key,
            model: self.model,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Gemini image editing provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: GeminiModel,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// The model this provider targets.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model.as_str())
    }

    async fn edit_impl(&self, request: &GenerationRequest) -> Result<GeneratedResult> {
        let start = Instant::now();
        let url = format!("{}:generateContent", self.model_url());
        let body = GeminiRequest::from_generation_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            images = request.image_count(),
            aspect_ratio = %request.aspect_ratio,
            "submitting Gemini edit request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        if let Some(reason) = gemini_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            tracing::warn!(block_reason = reason, "Gemini returned a prompt block reason");
        }

        let result = gemini_response.into_result();
        tracing::debug!(
            has_image = result.image_url.is_some(),
            has_text = result.text.is_some(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini edit complete"
        );
        Ok(result)
    }

    fn parse_error(
        &self,
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> MirageError {
        let text = sanitize_error_message(text);
        if status == 404 {
            return MirageError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            );
        }
        if status == 429 {
            let retry_after = parse_retry_after(headers).map(Duration::from_secs);
            return MirageError::RateLimited { retry_after };
        }
        if status == 401 || status == 403 {
            return MirageError::Auth(text);
        }
        let lower = text.to_lowercase();
        if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
            return MirageError::ContentBlocked(text);
        }
        if status == 400 {
            return MirageError::InvalidRequest(text);
        }
        MirageError::Api {
            status,
            message: text,
        }
    }
}

#[async_trait]
impl ImageEditor for GeminiProvider {
    async fn edit(&self, request: &GenerationRequest) -> Result<GeneratedResult> {
        self.edit_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(MirageError::Auth("Invalid API key".into())),
            404 => Err(MirageError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(MirageError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

impl From<&InlineImage> for GeminiRequestPart {
    fn from(image: &InlineImage) -> Self {
        Self::InlineData {
            inline_data: GeminiInlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    image_config: GeminiImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: &'static str,
}

impl GeminiRequest {
    /// Text first, then the primary image, then the secondary image.
    /// The model reads "Image 1" / "Image 2" from these positions.
    fn from_generation_request(req: &GenerationRequest) -> Self {
        let mut parts = vec![
            GeminiRequestPart::Text {
                text: req.prompt.clone(),
            },
            GeminiRequestPart::from(&req.primary),
        ];
        if let Some(ref secondary) = req.secondary {
            parts.push(GeminiRequestPart::from(secondary));
        }

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                image_config: GeminiImageConfig {
                    aspect_ratio: req.aspect_ratio.as_str(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

impl GeminiResponse {
    /// Scans the first candidate's parts in order; the last image and the
    /// last non-empty text win.
    fn into_result(self) -> GeneratedResult {
        let mut result = GeneratedResult::default();
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        for part in parts {
            if let Some(inline) = part.inline_data {
                let mime_type = inline
                    .mime_type
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
                result.image_url = Some(format!("data:{};base64,{}", mime_type, inline.data));
            } else if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                result.text = Some(text);
            }
        }
        result
    }
}
