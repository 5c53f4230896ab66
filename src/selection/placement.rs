//! Result panel placement next to a finished selection.
//!
//! Right of the selection if it fits, else left, else centered below;
//! then clamped so the panel never runs off the bottom or top.

use super::{Point, Viewport};
use crate::capture::SelectionRect;

pub const PANEL_WIDTH: f64 = 420.0;
pub const PANEL_MAX_HEIGHT: f64 = 500.0;
pub const PANEL_MARGIN: f64 = 16.0;
/// Vertical space always left free around a max-height panel.
const VIEWPORT_RESERVE: f64 = 64.0;

/// Max panel height for this viewport.
pub fn panel_max_height(viewport: &Viewport) -> f64 {
    PANEL_MAX_HEIGHT.min(viewport.height - VIEWPORT_RESERVE)
}

pub fn panel_position(rect: &SelectionRect, viewport: &Viewport) -> Point {
    let max_height = panel_max_height(viewport);

    let mut x = rect.x + rect.width + PANEL_MARGIN;
    let mut y = rect.y;

    if x + PANEL_WIDTH > viewport.width - PANEL_MARGIN {
        x = rect.x - PANEL_WIDTH - PANEL_MARGIN;
    }

    if x < PANEL_MARGIN {
        x = PANEL_MARGIN.max((viewport.width - PANEL_WIDTH) / 2.0);
        y = rect.y + rect.height + PANEL_MARGIN;
    }

    if y + max_height > viewport.height - PANEL_MARGIN {
        y = viewport.height - max_height - PANEL_MARGIN;
    }

    if y < PANEL_MARGIN {
        y = PANEL_MARGIN;
    }

    Point { x, y }
}
