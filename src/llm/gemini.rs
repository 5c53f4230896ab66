//! Provider A: Google Gemini `generateContent`.
//!
//! Key differences from the chat-completions provider:
//! - API key in URL query param, not header
//! - Image and prompt are sibling parts of one content block
//! - Answer is the concatenation of `candidates[0].content.parts[*].text`
//! - A `SAFETY` finish reason is a refusal, not an empty answer

use super::provider::{map_status, parse_body, OcrProvider, ProviderKind};
use super::transport::WireRequest;
use super::types::{
    GeminiContent, GeminiPart, GeminiRequest, GeminiResponse, GenerationConfig, InlineData,
};
use crate::capture::CroppedImage;
use crate::error::{OcrError, Result};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const GEMINI_MAX_TOKENS: u32 = 8192;
const GEMINI_TEMPERATURE: f64 = 0.1;

const ERROR_TABLE: &[(u16, &str)] = &[
    (401, "Gemini API key is invalid, update it in settings"),
    (403, "API key lacks permission or has been disabled"),
    (429, "Too many API requests, retry later"),
    (500, "Gemini server error, retry later"),
    (503, "Gemini service is temporarily unavailable, retry later"),
];

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    base_url: String,
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::with_base_url(GEMINI_BASE_URL)
    }
}

impl GeminiProvider {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl OcrProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn encode(&self, image: &CroppedImage, prompt: &str, model: &str, api_key: &str) -> WireRequest {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: CroppedImage::MIME_TYPE.to_string(),
                            data: image.to_base64(),
                        },
                    },
                    GeminiPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: GEMINI_TEMPERATURE,
                max_output_tokens: GEMINI_MAX_TOKENS,
            },
        };

        WireRequest {
            url: format!("{}/{}:generateContent?key={}", self.base_url, model, api_key),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: serde_json::to_value(body).unwrap_or_default(),
        }
    }

    fn decode(&self, body: &str) -> Result<String> {
        let response: GeminiResponse = parse_body(body)?;

        let candidate = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| OcrError::ResponseFormat("API returned an empty result".to_string()))?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            log::warn!("[LLM] Gemini finish reason SAFETY");
            return Err(OcrError::SafetyRejected);
        }

        let parts = candidate
            .content
            .and_then(|c| c.parts)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                OcrError::ResponseFormat("API returned an unexpected response format".to_string())
            })?;

        Ok(parts.into_iter().filter_map(|p| p.text).collect())
    }

    fn map_error(&self, status: u16, body: &str) -> OcrError {
        let envelope = super::types::ErrorEnvelope::parse(body);
        map_status(status, envelope.nested_message(), ERROR_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn image() -> CroppedImage {
        CroppedImage {
            png: vec![1, 2, 3],
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn encodes_inline_image_and_prompt_in_one_content_block() {
        let req = GeminiProvider::default().encode(&image(), "read it", "gemini-2.5-flash", "AIzaKEY");
        assert_eq!(
            req.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent?key=AIzaKEY"
        );
        assert!(req.header("authorization").is_none());

        let parts = &req.body["contents"][0]["parts"];
        assert_eq!(parts[0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[0]["inline_data"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "read it");
        assert_eq!(req.body["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(req.body["generationConfig"]["temperature"], 0.1);
    }

    #[test]
    fn decodes_concatenated_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"},{}]},"finishReason":"STOP"}]}"#;
        assert_eq!(GeminiProvider::default().decode(body).unwrap(), "Hello world");
    }

    #[test]
    fn safety_finish_reason_is_safety_rejected() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY","content":{"parts":[{"text":"x"}]}}]}"#;
        let err = GeminiProvider::default().decode(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SafetyRejected);

        // Even without content, SAFETY wins over a format error.
        let bare = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert_eq!(
            GeminiProvider::default().decode(bare).unwrap_err().kind(),
            ErrorKind::SafetyRejected
        );
    }

    #[test]
    fn missing_candidate_or_parts_is_response_format() {
        let provider = GeminiProvider::default();
        for body in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"finishReason":"STOP"}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            "not json",
        ] {
            assert_eq!(
                provider.decode(body).unwrap_err().kind(),
                ErrorKind::ResponseFormat,
                "body: {}",
                body
            );
        }
    }

    #[test]
    fn whitespace_answer_decodes_as_empty_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  \n"}]}}]}"#;
        let raw = GeminiProvider::default().decode(body).unwrap();
        assert_eq!(raw.trim(), "");
    }

    #[test]
    fn maps_statuses_through_table() {
        let provider = GeminiProvider::default();
        let err = provider.map_error(401, r#"{"error":{"message":"API key not valid"}}"#);
        assert_eq!(
            err,
            OcrError::ApiError {
                status: 401,
                message: "Gemini API key is invalid, update it in settings".to_string()
            }
        );

        let bad = provider.map_error(400, r#"{"error":{"message":"Unsupported MIME type"}}"#);
        assert_eq!(bad.to_string(), "Invalid request: Unsupported MIME type");

        let unmapped = provider.map_error(502, "");
        assert_eq!(unmapped.to_string(), "API request failed (502): ");
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let req = GeminiProvider::with_base_url("http://localhost:9000/models/").encode(
            &image(),
            "p",
            "m",
            "k",
        );
        assert_eq!(req.url, "http://localhost:9000/models/m:generateContent?key=k");
    }
}
