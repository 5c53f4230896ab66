//! Floating result panel.
//!
//! There is at most one panel per page. It is modelled as data (position,
//! size, state, copy button) plus `body_html`, which the host drops into the
//! panel body after every state change.

use super::clipboard::{copy_with_fallback, ClipboardError, ClipboardWriter, CopyMethod};
use super::markdown::{escape_html, render_markdown};
use crate::selection::placement::{panel_max_height, PANEL_WIDTH};
use crate::selection::{Point, Viewport};
use std::time::{Duration, Instant};

pub const PANEL_TITLE: &str = "Recognized Text";
pub const LOADING_LABEL: &str = "Recognizing…";
pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied";
pub const COPY_CONFIRMATION: Duration = Duration::from_secs(2);

const ERROR_ICON: &str = r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2"><circle cx="12" cy="12" r="10"/><line x1="15" y1="9" x2="9" y2="15"/><line x1="9" y1="9" x2="15" y2="15"/></svg>"#;

#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    Loading,
    /// `text` is the raw answer (what gets copied), `markup` its rendering.
    Result { text: String, markup: String },
    Error { message: String },
}

impl PanelState {
    pub fn result(text: impl Into<String>) -> Self {
        let text = text.into();
        let markup = render_markdown(&text);
        PanelState::Result { text, markup }
    }
}

/// Copy action with its transient confirmation.
#[derive(Debug, Clone, Default)]
pub struct CopyButton {
    text: Option<String>,
    confirmed_at: Option<Instant>,
}

impl CopyButton {
    fn arm(&mut self, text: &str) {
        self.text = Some(text.to_string());
        self.confirmed_at = None;
    }

    fn disarm(&mut self) {
        self.text = None;
        self.confirmed_at = None;
    }

    pub fn visible(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_confirming(&self, now: Instant) -> bool {
        self.confirmed_at
            .is_some_and(|at| now.saturating_duration_since(at) < COPY_CONFIRMATION)
    }

    pub fn label(&self, now: Instant) -> &'static str {
        if self.is_confirming(now) {
            COPIED_LABEL
        } else {
            COPY_LABEL
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DragOffset {
    dx: f64,
    dy: f64,
}

#[derive(Debug, Clone)]
pub struct ResultPanel {
    position: Point,
    width: f64,
    height: f64,
    state: PanelState,
    copy: CopyButton,
    drag: Option<DragOffset>,
}

impl ResultPanel {
    fn new(position: Point, viewport: &Viewport) -> Self {
        Self {
            position,
            width: PANEL_WIDTH,
            height: panel_max_height(viewport),
            state: PanelState::Loading,
            copy: CopyButton::default(),
            drag: None,
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn copy_button(&self) -> &CopyButton {
        &self.copy
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Inner HTML for the panel body in the current state.
    pub fn body_html(&self) -> String {
        match &self.state {
            PanelState::Loading => format!(
                "<div class=\"ocr-loading\"><div class=\"ocr-spinner\"></div><span>{}</span></div>",
                LOADING_LABEL
            ),
            PanelState::Error { message } => format!(
                "<div class=\"ocr-error\">{}<div class=\"ocr-error-message\">{}</div></div>",
                ERROR_ICON,
                escape_html(message)
            ),
            PanelState::Result { markup, .. } => {
                format!("<div class=\"ocr-text-content\">{}</div>", markup)
            }
        }
    }
}

/// Owns the page's single result panel.
#[derive(Debug, Default)]
pub struct ResultPresenter {
    panel: Option<ResultPanel>,
}

impl ResultPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panel(&self) -> Option<&ResultPanel> {
        self.panel.as_ref()
    }

    /// Open (or move) the panel in its loading state.
    pub fn show_loading(&mut self, position: Point, viewport: &Viewport) {
        let panel = self
            .panel
            .get_or_insert_with(|| ResultPanel::new(position, viewport));
        panel.position = position;
        panel.height = panel_max_height(viewport);
        panel.drag = None;
        self.set_state(PanelState::Loading);
        log::debug!("[PANEL] Loading at ({}, {})", position.x, position.y);
    }

    pub fn show_result(&mut self, text: &str) {
        self.set_state(PanelState::result(text));
    }

    pub fn show_error(&mut self, message: &str) {
        self.set_state(PanelState::Error {
            message: message.to_string(),
        });
    }

    fn set_state(&mut self, state: PanelState) {
        let Some(panel) = self.panel.as_mut() else {
            log::warn!("[PANEL] State change with no panel open, ignored");
            return;
        };
        match &state {
            PanelState::Result { text, .. } => panel.copy.arm(text),
            PanelState::Loading | PanelState::Error { .. } => panel.copy.disarm(),
        }
        panel.state = state;
    }

    /// Host reports the rendered panel size after layout.
    pub fn set_size(&mut self, width: f64, height: f64) {
        if let Some(panel) = self.panel.as_mut() {
            panel.width = width;
            panel.height = height;
        }
    }

    pub fn close(&mut self) -> bool {
        self.panel.take().is_some()
    }

    /// Pointer-down on the header. Presses on a header button never drag.
    pub fn begin_drag(&mut self, pointer: Point, on_button: bool) -> bool {
        let Some(panel) = self.panel.as_mut() else {
            return false;
        };
        if on_button {
            return false;
        }
        panel.drag = Some(DragOffset {
            dx: pointer.x - panel.position.x,
            dy: pointer.y - panel.position.y,
        });
        true
    }

    /// Move with the pointer, clamped to `[0, viewport - size]` per axis.
    pub fn drag_to(&mut self, pointer: Point, viewport: &Viewport) -> Option<Point> {
        let panel = self.panel.as_mut()?;
        let offset = panel.drag?;
        let max_x = (viewport.width - panel.width).max(0.0);
        let max_y = (viewport.height - panel.height).max(0.0);
        panel.position = Point {
            x: (pointer.x - offset.dx).min(max_x).max(0.0),
            y: (pointer.y - offset.dy).min(max_y).max(0.0),
        };
        Some(panel.position)
    }

    pub fn end_drag(&mut self) {
        if let Some(panel) = self.panel.as_mut() {
            panel.drag = None;
        }
    }

    /// Raw answer text, only while a result is shown.
    pub fn copy_text(&self) -> Option<&str> {
        self.panel.as_ref()?.copy.text.as_deref()
    }

    /// Copy the raw text and start the confirmation window.
    pub fn copy(
        &mut self,
        primary: &mut dyn ClipboardWriter,
        fallback: &mut dyn ClipboardWriter,
        now: Instant,
    ) -> Result<CopyMethod, ClipboardError> {
        let Some(panel) = self.panel.as_mut() else {
            return Err(ClipboardError::Write("no panel open".to_string()));
        };
        let Some(text) = panel.copy.text.clone() else {
            return Err(ClipboardError::Write("nothing to copy".to_string()));
        };
        let method = copy_with_fallback(primary, fallback, &text)?;
        panel.copy.confirmed_at = Some(now);
        Ok(method)
    }
}
