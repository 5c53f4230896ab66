//! Visible-surface capture via the xcap crate.

use super::ScreenSource;
use crate::error::{OcrError, Result};
use image::DynamicImage;
use xcap::Monitor;

/// Captures the primary monitor at its native (physical) resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryMonitor;

impl PrimaryMonitor {
    /// Logical-to-physical ratio of the primary monitor.
    ///
    /// Used by the CLI when the caller does not pass an explicit scale.
    pub fn scale_factor() -> Result<f64> {
        let monitor = find_primary()?;
        let scale = monitor
            .scale_factor()
            .map_err(|e| OcrError::CaptureFailed(e.to_string()))?;
        Ok(f64::from(scale))
    }
}

impl ScreenSource for PrimaryMonitor {
    async fn capture_visible(&self) -> Result<DynamicImage> {
        let start = std::time::Instant::now();

        // xcap talks to the display server synchronously (and spins up its own
        // runtime on Wayland), so keep it off the async executor.
        let image = tokio::task::spawn_blocking(|| -> Result<DynamicImage> {
            let monitor = find_primary()?;
            let rgba = monitor
                .capture_image()
                .map_err(|e| OcrError::CaptureFailed(e.to_string()))?;
            Ok(DynamicImage::ImageRgba8(rgba))
        })
        .await
        .map_err(|e| OcrError::CaptureFailed(format!("capture task failed: {}", e)))??;

        log::info!(
            "[CAPTURE] Primary monitor {}x{} in {}ms",
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }
}

fn find_primary() -> Result<Monitor> {
    let monitors = Monitor::all().map_err(|e| OcrError::CaptureFailed(e.to_string()))?;
    let mut fallback = None;
    for monitor in monitors {
        if monitor.is_primary().unwrap_or(false) {
            return Ok(monitor);
        }
        fallback.get_or_insert(monitor);
    }
    fallback.ok_or_else(|| OcrError::CaptureFailed("no monitor detected".to_string()))
}
