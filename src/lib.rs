//! glass-ocr: select a screen region, get its text back.
//!
//! This is the library shell that wires the domains together. Business
//! logic lives in the modules:
//!   - capture    : visible-surface screenshot + DPR-aware crop
//!   - selection  : drag-to-select state machine and panel placement
//!   - llm        : recognition providers, wire formats, output cleanup
//!   - settings   : provider / key / model / prompt resolution
//!   - pipeline   : capture → crop → configure → dispatch → normalize
//!   - messaging  : page ↔ background message passing
//!   - render     : markdown rendering, result panel, clipboard

pub mod capture;
pub mod error;
pub mod llm;
pub mod messaging;
pub mod pipeline;
pub mod render;
pub mod selection;
pub mod settings;

pub use error::{ErrorKind, OcrError, Result};

/// Load `.env.local` then `.env`, searching from the working directory up.
/// Variables already set in the environment are never overridden, so the
/// first file to define a key wins.
pub fn load_env() {
    for env_file in [".env.local", ".env"] {
        match dotenvy::from_filename(env_file) {
            Ok(path) => eprintln!("[STARTUP] Loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", env_file, e),
        }
    }
}
