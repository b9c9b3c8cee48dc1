//! Detection result types.

/// One detected face bounding box, in image-pixel coordinates.
///
/// Boxes are square by construction (the sliding window is square), but
/// width and height are kept separate so a future backend can relax that.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
