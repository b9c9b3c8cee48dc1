//! Detection stages: edge mapping and face detection.
//!
//! Face detection sits behind the `DetectorBackend` trait so the pipeline is
//! not married to one algorithm:
//! - `CpuBackend`: multi-scale sliding-window heuristic (default)
//! - `StubBackend`: fixed boxes, for tests
//!
//! Backends receive a grayscale view and return bounding boxes; `FaceDetector`
//! owns the grayscale conversion and the overlay drawing.

mod backend;
pub mod backends;
mod edges;
mod result;

pub use backend::{DetectParams, DetectorBackend};
pub use backends::{CpuBackend, StubBackend, MIN_NEIGHBORS};
pub use edges::detect_edges;
pub use result::FaceBox;

use anyhow::Result;
use image::{imageops, RgbImage};

use crate::overlay;

/// Face detection front end: grayscale conversion, backend dispatch, overlay.
pub struct FaceDetector {
    backend: Box<dyn DetectorBackend>,
}

impl FaceDetector {
    pub fn new(backend: Box<dyn DetectorBackend>) -> Self {
        Self { backend }
    }

    /// Default detector using the CPU heuristic backend.
    pub fn cpu() -> Self {
        Self::new(Box::new(CpuBackend::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Runs detection and returns the frame with box-and-label overlays drawn
    /// over each hit. Pixels outside the overlays are untouched.
    pub fn detect_faces(
        &mut self,
        frame: &RgbImage,
        params: &DetectParams,
    ) -> Result<(RgbImage, Vec<FaceBox>)> {
        let gray = imageops::grayscale(frame);
        let boxes = self.backend.detect(&gray, params)?;
        let mut out = frame.clone();
        overlay::draw_face_boxes(&mut out, &boxes);
        Ok((out, boxes))
    }
}
