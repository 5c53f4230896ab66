//! Provider trait: common interface for every recognition provider.
//!
//! Each provider encodes one request and decodes one response for its own
//! wire protocol. The pipeline picks the implementation once, from
//! configuration, and never branches on the provider itself.

use super::gemini::GeminiProvider;
use super::prompts::{GEMINI_DEFAULT_PROMPT, QWEN_DEFAULT_PROMPT};
use super::qwen::QwenProvider;
use super::transport::WireRequest;
use crate::capture::CroppedImage;
use crate::error::{OcrError, Result};
use serde::{Deserialize, Serialize};

/// Success value for a well-formed answer that contains no text.
pub const NO_TEXT_RECOGNIZED: &str = "(No text recognized)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Qwen,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::Qwen];

    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Qwen => "qwen",
        }
    }

    /// Human name of the credential, used in `ConfigMissing` messages.
    pub fn key_name(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Gemini API Key",
            ProviderKind::Qwen => "DashScope API Key",
        }
    }

    pub fn env_key(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Qwen => "DASHSCOPE_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::Qwen => "qwen-vl-ocr-latest",
        }
    }

    pub fn default_prompt(self) -> &'static str {
        match self {
            ProviderKind::Gemini => GEMINI_DEFAULT_PROMPT,
            ProviderKind::Qwen => QWEN_DEFAULT_PROMPT,
        }
    }

    /// Build the client for this provider with its production endpoint.
    pub fn client(self) -> Box<dyn OcrProvider> {
        match self {
            ProviderKind::Gemini => Box::new(GeminiProvider::default()),
            ProviderKind::Qwen => Box::new(QwenProvider::default()),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "qwen" | "dashscope" => Ok(ProviderKind::Qwen),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// Provider metadata exposed to the settings collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub env_key: String,
    pub default_model: String,
}

/// All known providers and their display info.
pub fn all_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            id: ProviderKind::Gemini.id().to_string(),
            name: "Google Gemini".to_string(),
            env_key: ProviderKind::Gemini.env_key().to_string(),
            default_model: ProviderKind::Gemini.default_model().to_string(),
        },
        ProviderInfo {
            id: ProviderKind::Qwen.id().to_string(),
            name: "Qwen VL (DashScope)".to_string(),
            env_key: ProviderKind::Qwen.env_key().to_string(),
            default_model: ProviderKind::Qwen.default_model().to_string(),
        },
    ]
}

pub trait OcrProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Build the single multimodal request: image part + instruction prompt.
    fn encode(&self, image: &CroppedImage, prompt: &str, model: &str, api_key: &str) -> WireRequest;

    /// Extract the raw answer text from a 2xx body. May be empty.
    fn decode(&self, body: &str) -> Result<String>;

    /// Map a non-2xx status + body through the provider's static table.
    fn map_error(&self, status: u16, body: &str) -> OcrError;

    /// Strip provider-specific wrapping. Receives already-trimmed, non-empty text.
    fn normalize(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Turn a decoded answer into the session's text: trimmed and normalized by
/// the provider, or the sentinel when nothing is left.
pub fn finish_answer(provider: &dyn OcrProvider, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NO_TEXT_RECOGNIZED.to_string();
    }
    let cleaned = provider.normalize(trimmed);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        NO_TEXT_RECOGNIZED.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Shared status-table lookup.
///
/// 400 always embeds the provider's message (or a hint that the image is
/// the likely culprit); other statuses come from `table`, and anything
/// unmapped gets the generic fallback.
pub(super) fn map_status(status: u16, message: Option<&str>, table: &[(u16, &str)]) -> OcrError {
    let message_text = message.unwrap_or_default();
    let text = if status == 400 {
        format!(
            "Invalid request: {}",
            message.unwrap_or("the image may be invalid")
        )
    } else if let Some((_, mapped)) = table.iter().find(|(code, _)| *code == status) {
        mapped.to_string()
    } else {
        format!("API request failed ({}): {}", status, message_text)
    };
    OcrError::ApiError {
        status,
        message: text,
    }
}

/// Parse a 2xx body, mapping malformed JSON to `ResponseFormat`.
pub(super) fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| OcrError::ResponseFormat(format!("Failed to parse API response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Passthrough;

    impl OcrProvider for Passthrough {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Gemini
        }
        fn encode(&self, _: &CroppedImage, _: &str, _: &str, _: &str) -> WireRequest {
            unreachable!()
        }
        fn decode(&self, body: &str) -> Result<String> {
            Ok(body.to_string())
        }
        fn map_error(&self, status: u16, _: &str) -> OcrError {
            map_status(status, None, &[])
        }
    }

    #[test]
    fn blank_answer_is_sentinel_success() {
        assert_eq!(finish_answer(&Passthrough, ""), NO_TEXT_RECOGNIZED);
        assert_eq!(finish_answer(&Passthrough, "  \n\t "), NO_TEXT_RECOGNIZED);
        assert_eq!(finish_answer(&Passthrough, "  hello \n"), "hello");
    }

    #[test]
    fn status_table_fallback_includes_status_and_message() {
        let table = [(429, "slow down")];
        assert_eq!(
            map_status(429, Some("ignored"), &table).to_string(),
            "slow down"
        );
        assert_eq!(
            map_status(418, Some("teapot"), &table).to_string(),
            "API request failed (418): teapot"
        );
        assert_eq!(
            map_status(400, None, &table).to_string(),
            "Invalid request: the image may be invalid"
        );
        assert_eq!(
            map_status(400, Some("bad mime"), &table).to_string(),
            "Invalid request: bad mime"
        );
    }

    #[test]
    fn provider_kind_parses_ids_and_alias() {
        assert_eq!("gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert_eq!(" Qwen ".parse::<ProviderKind>(), Ok(ProviderKind::Qwen));
        assert_eq!("dashscope".parse::<ProviderKind>(), Ok(ProviderKind::Qwen));
        assert!("openai".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn every_kind_has_provider_info() {
        let providers = all_providers();
        for kind in ProviderKind::ALL {
            assert!(providers.iter().any(|p| p.id == kind.id()));
            assert_eq!(kind.client().kind(), kind);
        }
    }
}
