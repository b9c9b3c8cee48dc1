//! Frame types and buffer geometry helpers.
//!
//! The pipeline standardizes on 3-channel RGB buffers (`image::RgbImage`).
//! Transforms that work in a single channel use `image::GrayImage` internally
//! and re-expand before handing the result back. A `CapturedFrame` wraps the
//! pixel buffer produced by a capture source together with its sequence
//! number, so downstream stages can report which capture they were looking at.

use image::{imageops, GrayImage, Rgb, RgbImage};

use crate::roi::Roi;

/// One frame as produced by a capture source.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    /// RGB24 pixel buffer.
    pub image: RgbImage,
    /// Monotonic capture sequence number, starting at 1.
    pub sequence: u64,
}

impl CapturedFrame {
    pub(crate) fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Expands a single-channel buffer back to 3 channels by replicating the
/// luminance value.
pub fn expand_gray(gray: &GrayImage) -> RgbImage {
    let mut rgb = RgbImage::new(gray.width(), gray.height());
    for (dst, src) in rgb.pixels_mut().zip(gray.pixels()) {
        let v = src.0[0];
        *dst = Rgb([v, v, v]);
    }
    rgb
}

/// Horizontally mirrors a frame (presentation convention for selfie-style
/// camera feeds).
pub fn mirror(frame: &RgbImage) -> RgbImage {
    imageops::flip_horizontal(frame)
}

/// Extracts the ROI sub-rectangle as an owned buffer.
///
/// The ROI is clamped to the frame bounds before cropping, so a committed ROI
/// from a larger frame cannot index out of range after a resolution change.
pub fn crop_roi(frame: &RgbImage, roi: Roi) -> RgbImage {
    let x1 = roi.x1.min(frame.width().saturating_sub(1));
    let y1 = roi.y1.min(frame.height().saturating_sub(1));
    let x2 = roi.x2.min(frame.width());
    let y2 = roi.y2.min(frame.height());
    let w = x2.saturating_sub(x1).max(1);
    let h = y2.saturating_sub(y1).max(1);
    imageops::crop_imm(frame, x1, y1, w, h).to_image()
}

/// Writes a processed sub-buffer back into a copy of `frame` at the ROI
/// position, leaving every pixel outside the rectangle untouched.
pub fn composite_roi(frame: &RgbImage, patch: &RgbImage, roi: Roi) -> RgbImage {
    let mut out = frame.clone();
    imageops::replace(&mut out, patch, roi.x1 as i64, roi.y1 as i64);
    out
}
