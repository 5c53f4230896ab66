//! Region cropping under device-pixel-ratio scaling.
//!
//! Selections arrive in logical units; the screenshot is in physical pixels.
//! The rectangle is scaled first and clamped second. Clamping before scaling
//! lets rounding push the region one pixel past the edge of the image.

use super::SelectionRect;
use crate::error::{OcrError, Result};
use base64::Engine;
use image::DynamicImage;

/// Pixel-space region of the source screenshot, always inside its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// PNG-encoded crop: the only artifact that leaves the machine.
#[derive(Debug, Clone)]
pub struct CroppedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CroppedImage {
    pub const MIME_TYPE: &'static str = "image/png";

    /// Standard base64 of the PNG bytes, without a data-URI prefix.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.png)
    }
}

/// Round half up, matching the browser's `Math.round`.
fn round_px(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Resolve the logical selection to a pixel region of a `image_width`×`image_height` source.
///
/// Fails with [`OcrError::CropBounds`] when either clamped dimension is ≤ 0.
pub fn resolve_region(
    image_width: u32,
    image_height: u32,
    rect: &SelectionRect,
    scale_factor: f64,
) -> Result<CropRegion> {
    let scaled_x = round_px(rect.x * scale_factor);
    let scaled_y = round_px(rect.y * scale_factor);
    let scaled_w = round_px(rect.width * scale_factor);
    let scaled_h = round_px(rect.height * scale_factor);

    let x = scaled_x.max(0);
    let y = scaled_y.max(0);
    let width = scaled_w.min(i64::from(image_width) - x);
    let height = scaled_h.min(i64::from(image_height) - y);

    if width <= 0 || height <= 0 {
        log::warn!(
            "[CROP] Empty region: scaled ({}, {}, {}x{}) against {}x{} image",
            scaled_x,
            scaled_y,
            scaled_w,
            scaled_h,
            image_width,
            image_height
        );
        return Err(OcrError::CropBounds);
    }

    // width > 0 implies x < image_width, so every value fits in u32.
    Ok(CropRegion {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    })
}

/// Crop the screenshot to the selection and encode the result as PNG.
pub fn crop(image: &DynamicImage, rect: &SelectionRect, scale_factor: f64) -> Result<CroppedImage> {
    let start = std::time::Instant::now();
    let region = resolve_region(image.width(), image.height(), rect, scale_factor)?;

    let cropped = image.crop_imm(region.x, region.y, region.width, region.height);

    let mut png = Vec::new();
    cropped
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| OcrError::CaptureFailed(format!("PNG encode failed: {}", e)))?;

    log::info!(
        "[CROP] Region ({}x{} at {},{}) scale {} in {}ms, {} bytes",
        region.width,
        region.height,
        region.x,
        region.y,
        scale_factor,
        start.elapsed().as_millis(),
        png.len()
    );

    Ok(CroppedImage {
        png,
        width: region.width,
        height: region.height,
    })
}
