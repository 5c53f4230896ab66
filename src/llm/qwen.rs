//! Provider B: Qwen VL through DashScope's OpenAI-compatible endpoint.
//!
//! Bearer auth, chat-completions payload with an `image_url` data URI.
//! The model likes to wrap its answer in code fences or HTML, so decoded
//! text goes through the normalizer before it reaches the panel.

use super::normalize;
use super::provider::{map_status, parse_body, OcrProvider, ProviderKind};
use super::transport::WireRequest;
use super::types::{ChatContentPart, ChatMessage, ChatRequest, ChatResponse, ErrorEnvelope, ImageUrl};
use crate::capture::CroppedImage;
use crate::error::{OcrError, Result};

pub const QWEN_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

/// Pixel budget hints understood by the Qwen VL OCR models.
const MIN_PIXELS: u32 = 3072;
const MAX_PIXELS: u32 = 8_388_608;

const ERROR_TABLE: &[(u16, &str)] = &[
    (401, "DashScope API key is invalid, update it in settings"),
    (403, "API key lacks permission or has been disabled"),
    (429, "Too many API requests, retry later"),
    (500, "Qwen server error, retry later"),
    (503, "Qwen service is temporarily unavailable, retry later"),
];

/// DashScope's content-moderation rejection code.
const DATA_INSPECTION_FAILED: &str = "DataInspectionFailed";

#[derive(Debug, Clone)]
pub struct QwenProvider {
    endpoint: String,
}

impl Default for QwenProvider {
    fn default() -> Self {
        Self::with_endpoint(QWEN_BASE_URL)
    }
}

impl QwenProvider {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl OcrProvider for QwenProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Qwen
    }

    fn encode(&self, image: &CroppedImage, prompt: &str, model: &str, api_key: &str) -> WireRequest {
        let body = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ChatContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{}", CroppedImage::MIME_TYPE, image.to_base64()),
                        },
                        min_pixels: MIN_PIXELS,
                        max_pixels: MAX_PIXELS,
                    },
                    ChatContentPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        };

        WireRequest {
            url: self.endpoint.clone(),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("authorization".to_string(), format!("Bearer {}", api_key)),
            ],
            body: serde_json::to_value(body).unwrap_or_default(),
        }
    }

    fn decode(&self, body: &str) -> Result<String> {
        let response: ChatResponse = parse_body(body)?;

        let choice = response
            .choices
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| OcrError::ResponseFormat("API returned an empty result".to_string()))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            log::warn!("[LLM] Qwen finish reason content_filter");
            return Err(OcrError::SafetyRejected);
        }

        choice
            .message
            .and_then(|m| m.content)
            .map(|c| c.into_text())
            .ok_or_else(|| {
                OcrError::ResponseFormat("API returned an unexpected response format".to_string())
            })
    }

    fn map_error(&self, status: u16, body: &str) -> OcrError {
        let envelope = ErrorEnvelope::parse(body);
        if envelope.code().as_deref() == Some(DATA_INSPECTION_FAILED) {
            return OcrError::SafetyRejected;
        }
        let message = envelope.nested_message().or(envelope.flat_message());
        map_status(status, message, ERROR_TABLE)
    }

    fn normalize(&self, text: &str) -> String {
        normalize::normalize(text)
    }
}
