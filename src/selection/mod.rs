//! Drag-to-select state machine for the page context.
//!
//! Idle → Armed → Dragging → Dispatched | Cancelled. A session is created
//! per activation and dropped on its terminal transition; the controller
//! holds at most one. Overlay elements are modelled as plain data the host
//! renders after every transition.

pub mod placement;

use crate::capture::SelectionRect;

/// Selections smaller than this (logical px, either side) are discarded.
pub const MIN_SELECTION_SIZE: f64 = 10.0;

pub const INITIAL_HINT: &str = "Drag to select the area to recognize  ·  ESC to cancel";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Visible page area in logical units, plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scale_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    Dragging,
    Dispatched,
}

/// Live selection box with its size readout.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionBox {
    pub rect: SelectionRect,
    pub size_label: String,
}

/// Overlay elements for the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Hidden (not removed) once dispatched, so the page does not flicker
    /// before the screenshot is taken.
    pub visible: bool,
    pub hint: Option<&'static str>,
    pub selection: Option<SelectionBox>,
}

/// Everything the background needs for one capture, plus where the page
/// should put the result panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    pub rect: SelectionRect,
    pub scale_factor: f64,
    pub panel_position: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerUp {
    /// No drag in progress.
    Ignored,
    /// Too small; session torn down, nothing sent.
    Cancelled,
    Dispatch(CaptureRequest),
}

#[derive(Debug, Clone, PartialEq)]
enum SessionState {
    Armed,
    Dragging { start: Point, current: Point },
    Dispatched(CaptureRequest),
}

#[derive(Debug)]
struct SelectionSession {
    state: SessionState,
    overlay: Overlay,
}

impl SelectionSession {
    fn armed() -> Self {
        Self {
            state: SessionState::Armed,
            overlay: Overlay {
                visible: true,
                hint: Some(INITIAL_HINT),
                selection: None,
            },
        }
    }

    fn refresh_box(&mut self) {
        if let SessionState::Dragging { start, current } = self.state {
            let rect = SelectionRect::from_corners((start.x, start.y), (current.x, current.y));
            self.overlay.selection = Some(SelectionBox {
                rect,
                size_label: format!("{} × {}", rect.width.round(), rect.height.round()),
            });
        }
    }
}

#[derive(Debug)]
pub struct SelectionController {
    session: Option<SelectionSession>,
    viewport: Viewport,
}

impl SelectionController {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            session: None,
            viewport,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn phase(&self) -> Phase {
        match self.session.as_ref().map(|s| &s.state) {
            None => Phase::Idle,
            Some(SessionState::Armed) => Phase::Armed,
            Some(SessionState::Dragging { .. }) => Phase::Dragging,
            Some(SessionState::Dispatched(_)) => Phase::Dispatched,
        }
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.session.as_ref().map(|s| &s.overlay)
    }

    /// Start a session. No-op (returns false) while one is live.
    pub fn activate(&mut self) -> bool {
        if self.session.is_some() {
            log::debug!("[SELECTION] Activation ignored, session already {:?}", self.phase());
            return false;
        }
        self.session = Some(SelectionSession::armed());
        log::info!("[SELECTION] Armed");
        true
    }

    pub fn pointer_down(&mut self, at: Point, button: PointerButton) -> bool {
        if button != PointerButton::Primary {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.state != SessionState::Armed {
            return false;
        }
        session.overlay.hint = None;
        session.state = SessionState::Dragging {
            start: at,
            current: at,
        };
        session.refresh_box();
        true
    }

    pub fn pointer_move(&mut self, at: Point) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match &mut session.state {
            SessionState::Dragging { current, .. } => {
                *current = at;
                session.refresh_box();
                true
            }
            _ => false,
        }
    }

    pub fn pointer_up(&mut self, at: Point) -> PointerUp {
        let Some(session) = self.session.as_mut() else {
            return PointerUp::Ignored;
        };
        let SessionState::Dragging { start, .. } = session.state else {
            return PointerUp::Ignored;
        };

        let rect = SelectionRect::from_corners((start.x, start.y), (at.x, at.y));
        if rect.width < MIN_SELECTION_SIZE || rect.height < MIN_SELECTION_SIZE {
            log::info!(
                "[SELECTION] Cancelled: {}x{} is below the minimum",
                rect.width,
                rect.height
            );
            self.session = None;
            return PointerUp::Cancelled;
        }

        let request = CaptureRequest {
            rect,
            scale_factor: self.viewport.scale_factor,
            panel_position: placement::panel_position(&rect, &self.viewport),
        };
        session.overlay.visible = false;
        session.state = SessionState::Dispatched(request);
        log::info!(
            "[SELECTION] Dispatching {}x{} at ({},{})",
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );
        PointerUp::Dispatch(request)
    }

    /// Escape cancels Armed and Dragging sessions. Returns true if it did.
    pub fn key_down(&mut self, key: &str) -> bool {
        if key != "Escape" {
            return false;
        }
        match self.phase() {
            Phase::Armed | Phase::Dragging => {
                log::info!("[SELECTION] Cancelled by Escape");
                self.session = None;
                true
            }
            Phase::Idle | Phase::Dispatched => false,
        }
    }

    /// The dispatched session got its reply; tear the overlay down.
    pub fn complete(&mut self) -> Option<CaptureRequest> {
        match self.session.take() {
            Some(SelectionSession {
                state: SessionState::Dispatched(request),
                ..
            }) => Some(request),
            other => {
                self.session = other;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SelectionController {
        SelectionController::new(Viewport {
            width: 1600.0,
            height: 1000.0,
            scale_factor: 2.0,
        })
    }

    fn pt(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    #[test]
    fn full_drag_dispatches_normalized_rect_with_scale() {
        let mut c = controller();
        assert!(c.activate());
        assert_eq!(c.overlay().unwrap().hint, Some(INITIAL_HINT));

        assert!(c.pointer_down(pt(300.0, 200.0), PointerButton::Primary));
        assert_eq!(c.phase(), Phase::Dragging);
        assert!(c.overlay().unwrap().hint.is_none());

        c.pointer_move(pt(150.0, 120.0));
        let live = c.overlay().unwrap().selection.clone().unwrap();
        assert_eq!(live.size_label, "150 × 80");

        let PointerUp::Dispatch(req) = c.pointer_up(pt(100.0, 100.0)) else {
            panic!("expected dispatch");
        };
        assert_eq!(
            req.rect,
            SelectionRect {
                x: 100.0,
                y: 100.0,
                width: 200.0,
                height: 100.0
            }
        );
        assert_eq!(req.scale_factor, 2.0);
        assert_eq!(req.panel_position, pt(316.0, 100.0));

        assert_eq!(c.phase(), Phase::Dispatched);
        let overlay = c.overlay().unwrap();
        assert!(!overlay.visible, "overlay is hidden, not removed");
    }

    #[test]
    fn small_selection_cancels_without_dispatch() {
        let mut c = controller();
        c.activate();
        c.pointer_down(pt(10.0, 10.0), PointerButton::Primary);
        assert_eq!(c.pointer_up(pt(200.0, 19.0)), PointerUp::Cancelled);
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.overlay().is_none());

        c.activate();
        c.pointer_down(pt(10.0, 10.0), PointerButton::Primary);
        assert!(matches!(c.pointer_up(pt(20.0, 20.0)), PointerUp::Dispatch(_)));
    }

    #[test]
    fn reentrant_activation_is_ignored() {
        let mut c = controller();
        assert!(c.activate());
        assert!(!c.activate());
        c.pointer_down(pt(0.0, 0.0), PointerButton::Primary);
        assert!(!c.activate());
        assert_eq!(c.phase(), Phase::Dragging);
        c.pointer_up(pt(50.0, 50.0));
        assert!(!c.activate());
        assert_eq!(c.phase(), Phase::Dispatched);

        assert!(c.complete().is_some());
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.activate());
    }

    #[test]
    fn escape_cancels_armed_and_dragging_only() {
        let mut c = controller();
        c.activate();
        assert!(c.key_down("Escape"));
        assert_eq!(c.phase(), Phase::Idle);

        c.activate();
        c.pointer_down(pt(0.0, 0.0), PointerButton::Primary);
        assert!(!c.key_down("Enter"));
        assert!(c.key_down("Escape"));
        assert!(c.overlay().is_none());

        c.activate();
        c.pointer_down(pt(0.0, 0.0), PointerButton::Primary);
        c.pointer_up(pt(40.0, 40.0));
        assert!(!c.key_down("Escape"));
        assert_eq!(c.phase(), Phase::Dispatched);
    }

    #[test]
    fn secondary_button_and_idle_events_are_ignored() {
        let mut c = controller();
        assert!(!c.pointer_down(pt(0.0, 0.0), PointerButton::Primary));
        assert_eq!(c.pointer_up(pt(50.0, 50.0)), PointerUp::Ignored);

        c.activate();
        assert!(!c.pointer_down(pt(0.0, 0.0), PointerButton::Secondary));
        assert!(!c.pointer_move(pt(10.0, 10.0)));
        assert_eq!(c.pointer_up(pt(50.0, 50.0)), PointerUp::Ignored);
        assert_eq!(c.phase(), Phase::Armed);
        assert!(c.complete().is_none());
        assert_eq!(c.phase(), Phase::Armed);
    }
}
