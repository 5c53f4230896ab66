//! Error taxonomy for the capture-to-text pipeline.
//!
//! Every pipeline step either returns a value or fails with exactly one
//! `OcrError`. The `Display` text is what the result panel shows, so it is
//! written for the user, not for the log.

use serde::{Deserialize, Serialize};

/// Discriminant of an [`OcrError`], stable across the messaging boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    CaptureFailed,
    CropBounds,
    ConfigMissing,
    NetworkTimeout,
    NetworkFailed,
    ApiError,
    SafetyRejected,
    ResponseFormat,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OcrError {
    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Selection is outside the captured screenshot, please try again")]
    CropBounds,

    #[error("{key_name} is not configured, open the settings to add it")]
    ConfigMissing { key_name: &'static str },

    #[error("Request timed out after {0} seconds, check your network connection and retry")]
    NetworkTimeout(u64),

    #[error("Network request failed: {0}")]
    NetworkFailed(String),

    #[error("{message}")]
    ApiError { status: u16, message: String },

    #[error("Content was blocked by the provider's safety filter, try another region")]
    SafetyRejected,

    #[error("{0}")]
    ResponseFormat(String),
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::CaptureFailed(_) => ErrorKind::CaptureFailed,
            OcrError::CropBounds => ErrorKind::CropBounds,
            OcrError::ConfigMissing { .. } => ErrorKind::ConfigMissing,
            OcrError::NetworkTimeout(_) => ErrorKind::NetworkTimeout,
            OcrError::NetworkFailed(_) => ErrorKind::NetworkFailed,
            OcrError::ApiError { .. } => ErrorKind::ApiError,
            OcrError::SafetyRejected => ErrorKind::SafetyRejected,
            OcrError::ResponseFormat(_) => ErrorKind::ResponseFormat,
        }
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;
