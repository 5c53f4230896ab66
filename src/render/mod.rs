pub mod clipboard;
pub mod markdown;
pub mod panel;

pub use clipboard::{
    copy_with_fallback, ClipboardError, ClipboardWriter, CommandClipboard, CopyMethod,
    DetectedCommandClipboard, SystemClipboard,
};
pub use markdown::{escape_html, render_markdown};
pub use panel::{CopyButton, PanelState, ResultPanel, ResultPresenter};
