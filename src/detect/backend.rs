//! Face detector backend contract.

use anyhow::Result;
use image::GrayImage;

use crate::detect::result::FaceBox;

/// Tuning knobs shared by every backend.
#[derive(Clone, Copy, Debug)]
pub struct DetectParams {
    /// Smallest detectable face box edge, in pixels.
    pub min_size: u32,
    /// Window pyramid growth factor as an integer percent-of-ten:
    /// 11..=20 maps to 1.1..=2.0. Out-of-range values are clamped.
    pub scale_percent: u32,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            min_size: 30,
            scale_percent: 11,
        }
    }
}

impl DetectParams {
    /// The real pyramid growth factor.
    pub fn scale_factor(&self) -> f32 {
        self.scale_percent.clamp(11, 20) as f32 / 10.0
    }
}

/// A pluggable face detector. Backends see only a grayscale view of the
/// frame and report bounding boxes; drawing overlays is not their concern.
pub trait DetectorBackend {
    fn name(&self) -> &'static str;

    fn detect(&mut self, gray: &GrayImage, params: &DetectParams) -> Result<Vec<FaceBox>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_percent_clamps_into_range() {
        let low = DetectParams {
            min_size: 30,
            scale_percent: 3,
        };
        let high = DetectParams {
            min_size: 30,
            scale_percent: 90,
        };
        assert!((low.scale_factor() - 1.1).abs() < f32::EPSILON);
        assert!((high.scale_factor() - 2.0).abs() < f32::EPSILON);
    }
}
