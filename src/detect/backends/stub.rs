//! Stub face detection backend for tests.

use anyhow::Result;
use image::GrayImage;

use crate::detect::backend::{DetectParams, DetectorBackend};
use crate::detect::result::FaceBox;

/// Reports a fixed set of boxes regardless of input, clipped to the frame.
#[derive(Default)]
pub struct StubBackend {
    boxes: Vec<FaceBox>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boxes(boxes: Vec<FaceBox>) -> Self {
        Self { boxes }
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, gray: &GrayImage, params: &DetectParams) -> Result<Vec<FaceBox>> {
        Ok(self
            .boxes
            .iter()
            .copied()
            .filter(|b| {
                b.width >= params.min_size
                    && b.x + b.width <= gray.width()
                    && b.y + b.height <= gray.height()
            })
            .collect())
    }
}
