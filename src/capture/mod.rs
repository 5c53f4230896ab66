//! Screen capture domain: public API.
//!
//! Owns the visible-surface screenshot and the pixel-exact crop of the
//! user's selection. External code should only use what is exported here.

mod region;
mod screenshot;

pub use region::{crop, resolve_region, CropRegion, CroppedImage};
pub use screenshot::PrimaryMonitor;

use crate::error::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// User-drawn capture region in viewport-relative logical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRect {
    /// Normalized rectangle spanning two corner points, whatever the drag direction.
    pub fn from_corners(start: (f64, f64), current: (f64, f64)) -> Self {
        Self {
            x: start.0.min(current.0),
            y: start.1.min(current.1),
            width: (current.0 - start.0).abs(),
            height: (current.1 - start.1).abs(),
        }
    }
}

/// Source of the full visible surface, in physical pixels.
///
/// The pipeline captures exactly once per session; implementations are
/// free to block internally as long as they do it off the async executor.
pub trait ScreenSource: Send + Sync {
    fn capture_visible(&self) -> impl Future<Output = Result<DynamicImage>> + Send;
}
