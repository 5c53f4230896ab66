//! Recognition provider domain.
//!
//! Public API for turning a cropped image into text through a remote
//! vision model. External code should only use what is exported here.
//!
//! Providers:
//!   - Google Gemini (gemini.rs)
//!   - Qwen VL via DashScope (qwen.rs)
//!
//! Shared:
//!   - provider.rs : provider trait, kinds, metadata, status tables
//!   - transport.rs: HTTP seam (reqwest in production)
//!   - normalize.rs: strips fences / HTML / headings from model output

pub mod gemini;
pub mod normalize;
pub mod prompts;
pub mod provider;
pub mod qwen;
pub mod transport;
pub mod types;

pub use gemini::GeminiProvider;
pub use provider::{
    all_providers, finish_answer, OcrProvider, ProviderInfo, ProviderKind, NO_TEXT_RECOGNIZED,
};
pub use qwen::QwenProvider;
pub use transport::{HttpTransport, ReqwestTransport, WireRequest, WireResponse};
