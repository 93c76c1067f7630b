//! Image diff engine
//!
//! Turns a baseline image and a fresh capture into a change percentage, a
//! clean/changed classification, and an optional highlight overlay. Operates
//! on raw RGBA buffers; PNG encode/decode happens only at the boundary.
//!
//! Dimension policy: when the two images disagree in size, the overlapping
//! region is compared pixel by pixel and every excluded pixel is charged to
//! the change percentage. A strict full-reject would flag any feed-like page
//! whose height drifts; pure clipping would hide real growth. Folding does
//! neither.

use crate::error::{Error, Result};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Configuration for comparing a baseline against a capture.
///
/// All thresholds live here rather than as constants inside the comparison
/// loop, so boundary behavior is exercisable from tests.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Normalized per-pixel color distance above which a pixel counts as
    /// different. 0.0 flags any change at all, 1.0 flags nothing.
    pub pixel_threshold: f64,
    /// Change percentage at or below which a result still classifies as
    /// `Clean`. Guards against anti-aliasing noise.
    pub epsilon_percent: f64,
    /// RGBA highlight painted over differing pixels in the overlay. Partial
    /// alpha so the overlay composites over either source image.
    pub highlight: [u8; 4],
    /// Whether to build the overlay image at all.
    pub generate_overlay: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            pixel_threshold: 0.1,
            epsilon_percent: 0.01,
            highlight: [255, 0, 128, 160],
            generate_overlay: true,
        }
    }
}

impl DiffConfig {
    /// Sets the per-pixel color distance threshold.
    pub fn with_pixel_threshold(mut self, threshold: f64) -> Self {
        self.pixel_threshold = threshold;
        self
    }

    /// Sets the clean/changed epsilon, in percent.
    pub fn with_epsilon_percent(mut self, epsilon: f64) -> Self {
        self.epsilon_percent = epsilon;
        self
    }

    /// Enables or disables overlay generation.
    pub fn with_overlay(mut self, generate: bool) -> Self {
        self.generate_overlay = generate;
        self
    }
}

/// Classification of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// At or below epsilon: no change worth reporting
    Clean,
    /// Above epsilon: a human should look
    Changed,
}

/// Result of comparing two images.
#[derive(Debug, Clone)]
pub struct DiffReport {
    /// Percentage of the union extent that differs, in [0, 100]
    pub diff_percent: f64,
    pub status: Status,
    /// Highlight image sized to the compared (intersection) region; present
    /// only when at least one pixel differs
    pub overlay: Option<RgbaImage>,
    /// Pixels inside the compared region that exceeded the threshold
    pub differing_pixels: u64,
    /// Width of the compared region
    pub compared_width: u32,
    /// Height of the compared region
    pub compared_height: u32,
}

/// Normalized perceptual distance between two RGBA pixels, in [0, 1].
///
/// Channel deltas are weighted with the Rec. 709 luma coefficients (the eye
/// is far more sensitive to green than to blue); alpha contributes its own
/// term so a fade-out registers even when the color underneath is unchanged.
fn color_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> f64 {
    let dr = (a[0] as f64 - b[0] as f64) / 255.0;
    let dg = (a[1] as f64 - b[1] as f64) / 255.0;
    let db = (a[2] as f64 - b[2] as f64) / 255.0;
    let da = (a[3] as f64 - b[3] as f64) / 255.0;

    let weighted = 0.2126 * dr * dr + 0.7152 * dg * dg + 0.0722 * db * db + da * da;
    weighted.sqrt().min(1.0)
}

/// Compare two RGBA buffers according to the provided config.
pub fn compare_images(baseline: &RgbaImage, capture: &RgbaImage, config: &DiffConfig) -> DiffReport {
    let width = baseline.width().min(capture.width());
    let height = baseline.height().min(capture.height());

    let union_area = (baseline.width().max(capture.width()) as u64)
        * (baseline.height().max(capture.height()) as u64);
    let compared_area = (width as u64) * (height as u64);
    let excluded = union_area - compared_area;

    let mut overlay = if config.generate_overlay && compared_area > 0 {
        // Zero-filled, so matching pixels stay fully transparent.
        Some(RgbaImage::new(width, height))
    } else {
        None
    };

    let mut differing = 0u64;
    for y in 0..height {
        for x in 0..width {
            let a = baseline.get_pixel(x, y);
            let b = capture.get_pixel(x, y);
            if color_distance(a, b) > config.pixel_threshold {
                differing += 1;
                if let Some(ref mut img) = overlay {
                    img.put_pixel(x, y, Rgba(config.highlight));
                }
            }
        }
    }

    let diff_percent = if union_area > 0 {
        ((differing + excluded) as f64 / union_area as f64) * 100.0
    } else {
        0.0
    };

    let status = if diff_percent <= config.epsilon_percent {
        Status::Clean
    } else {
        Status::Changed
    };

    // An overlay with nothing painted carries no information; absence is the
    // contract for "no differing pixels", not a blank image.
    let overlay = overlay.filter(|_| differing > 0);

    DiffReport {
        diff_percent,
        status,
        overlay,
        differing_pixels: differing,
        compared_width: width,
        compared_height: height,
    }
}

/// Compare two PNG byte buffers.
pub fn compare_png(baseline: &[u8], capture: &[u8], config: &DiffConfig) -> Result<DiffReport> {
    let baseline = decode_png(baseline)?;
    let capture = decode_png(capture)?;
    Ok(compare_images(&baseline, &capture, config))
}

/// Infallible entry point for the check pipeline.
///
/// An undiagnosable comparison (either buffer fails to decode) is reported
/// as a full change so the operator is alerted, never silently as clean.
pub fn compare_or_failsafe(baseline: &[u8], capture: &[u8], config: &DiffConfig) -> DiffReport {
    match compare_png(baseline, capture, config) {
        Ok(report) => report,
        Err(err) => {
            log::warn!("comparison failed, reporting maximal difference: {}", err);
            DiffReport {
                diff_percent: 100.0,
                status: Status::Changed,
                overlay: None,
                differing_pixels: 0,
                compared_width: 0,
                compared_height: 0,
            }
        }
    }
}

/// Decode PNG bytes into an RGBA buffer.
pub fn decode_png(data: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory_with_format(data, ImageFormat::Png)
        .map(|img| img.to_rgba8())
        .map_err(|e| Error::Decode(format!("not a valid PNG: {e}")))
}

/// Encode an RGBA buffer back to PNG bytes for the storage boundary.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| Error::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buffer)
}
