//! The selectable filter chain.
//!
//! Filters are pure transforms over RGB buffers: `apply` is a total function
//! with no failure modes. Selecting a filter the chain does not know about
//! behaves as the identity, so operator input can never break a tick.
//!
//! Tunable filters carry their parameters in the variant itself, which keeps
//! the per-tick configuration snapshot self-contained and lets the dispatch
//! be an exhaustive match.

use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{adaptive_threshold, threshold, ThresholdType};
use imageproc::filter::{bilateral_filter, filter3x3, gaussian_blur_f32, median_filter};

use crate::frame::expand_gray;

/// Bounds for the configurable blur/sketch kernel size.
pub const MIN_BLUR_KERNEL: u32 = 1;
pub const MAX_BLUR_KERNEL: u32 = 31;

const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];
const EMBOSS_KERNEL: [f32; 9] = [-2.0, -1.0, 0.0, -1.0, 1.0, 1.0, 0.0, 1.0, 2.0];

/// One selectable transform, with its tunable parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    None,
    Grayscale,
    Sepia,
    Blur { kernel: u32 },
    Sharpen,
    Invert,
    Cartoon,
    Sketch { kernel: u32 },
    Emboss,
    Binary,
}

impl Filter {
    /// Resolves an operator-facing filter name. Unknown names select `None`,
    /// matching the chain's identity-for-unsupported rule. `kernel` feeds the
    /// blur-family filters.
    pub fn from_name(name: &str, kernel: u32) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "grayscale" => Filter::Grayscale,
            "sepia" => Filter::Sepia,
            "blur" => Filter::Blur { kernel },
            "sharp" | "sharpen" => Filter::Sharpen,
            "invert" => Filter::Invert,
            "cartoon" => Filter::Cartoon,
            "sketch" => Filter::Sketch { kernel },
            "emboss" => Filter::Emboss,
            "binary" => Filter::Binary,
            _ => Filter::None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::None => "none",
            Filter::Grayscale => "grayscale",
            Filter::Sepia => "sepia",
            Filter::Blur { .. } => "blur",
            Filter::Sharpen => "sharp",
            Filter::Invert => "invert",
            Filter::Cartoon => "cartoon",
            Filter::Sketch { .. } => "sketch",
            Filter::Emboss => "emboss",
            Filter::Binary => "binary",
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::None
    }
}

/// Applies `filter` to `frame`, returning a new buffer of the same size.
pub fn apply(frame: &RgbImage, filter: Filter) -> RgbImage {
    match filter {
        Filter::None => frame.clone(),
        Filter::Grayscale => expand_gray(&imageops::grayscale(frame)),
        Filter::Sepia => sepia(frame),
        Filter::Blur { kernel } => blur(frame, kernel),
        Filter::Sharpen => filter3x3::<_, f32, u8>(frame, &SHARPEN_KERNEL),
        Filter::Invert => invert(frame),
        Filter::Cartoon => cartoon(frame),
        Filter::Sketch { kernel } => sketch(frame, kernel),
        Filter::Emboss => filter3x3::<_, f32, u8>(frame, &EMBOSS_KERNEL),
        Filter::Binary => binary(frame),
    }
}

/// Forces a configured kernel size into the accepted odd range.
pub fn normalize_kernel(kernel: u32) -> u32 {
    let k = kernel.clamp(MIN_BLUR_KERNEL, MAX_BLUR_KERNEL);
    if k % 2 == 0 {
        k + 1
    } else {
        k
    }
}

// Conventional kernel-size to Gaussian sigma mapping, so the operator-facing
// 1..=31 kernel range keeps its familiar feel.
fn sigma_for_kernel(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn blur(frame: &RgbImage, kernel: u32) -> RgbImage {
    let k = normalize_kernel(kernel);
    if k <= 1 {
        return frame.clone();
    }
    gaussian_blur_f32(frame, sigma_for_kernel(k))
}

fn sepia(frame: &RgbImage) -> RgbImage {
    let mut out = RgbImage::new(frame.width(), frame.height());
    for (dst, src) in out.pixels_mut().zip(frame.pixels()) {
        let [r, g, b] = src.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let nr = 0.393 * r + 0.769 * g + 0.189 * b;
        let ng = 0.349 * r + 0.686 * g + 0.168 * b;
        let nb = 0.272 * r + 0.534 * g + 0.131 * b;
        *dst = Rgb([clamp_u8(nr), clamp_u8(ng), clamp_u8(nb)]);
    }
    out
}

fn invert(frame: &RgbImage) -> RgbImage {
    let mut out = frame.clone();
    imageops::invert(&mut out);
    out
}

fn cartoon(frame: &RgbImage) -> RgbImage {
    // Edge mask: grayscale, median smoothing, adaptive mean threshold.
    let gray = imageops::grayscale(frame);
    let smoothed = median_filter(&gray, 2, 2);
    let mask = adaptive_threshold(&smoothed, 4);

    // Flatten the color regions. The bilateral filter is single-channel, so
    // each channel is smoothed independently and recombined.
    let channels: Vec<GrayImage> = (0..3)
        .map(|c| {
            let plane =
                GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
                    Luma([frame.get_pixel(x, y).0[c]])
                });
            bilateral_filter(&plane, 9, 300.0, 300.0)
        })
        .collect();

    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] > 0 {
            Rgb([
                channels[0].get_pixel(x, y).0[0],
                channels[1].get_pixel(x, y).0[0],
                channels[2].get_pixel(x, y).0[0],
            ])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

fn sketch(frame: &RgbImage, kernel: u32) -> RgbImage {
    let gray = imageops::grayscale(frame);
    let inverted = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([255 - gray.get_pixel(x, y).0[0]])
    });

    let k = normalize_kernel(kernel);
    let blurred_inverted = if k <= 1 {
        inverted
    } else {
        gaussian_blur_f32(&inverted, sigma_for_kernel(k))
    };

    // Color-dodge blend of the grayscale base over the blurred negative.
    let sketch = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let base = gray.get_pixel(x, y).0[0] as u32;
        let denom = 256 - blurred_inverted.get_pixel(x, y).0[0] as u32;
        Luma([((base * 256) / denom).min(255) as u8])
    });
    expand_gray(&sketch)
}

fn binary(frame: &RgbImage) -> RgbImage {
    let gray = imageops::grayscale(frame);
    expand_gray(&threshold(&gray, 127, ThresholdType::Binary))
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([
                ((x * 7 + y * 3) % 256) as u8,
                ((x * 2 + y * 11) % 256) as u8,
                ((x + y * 5) % 256) as u8,
            ])
        })
    }

    #[test]
    fn none_is_identity() {
        let frame = scene(24, 24);
        assert_eq!(apply(&frame, Filter::None), frame);
    }

    #[test]
    fn unknown_filter_name_selects_identity() {
        assert_eq!(Filter::from_name("posterize", 5), Filter::None);
        assert_eq!(Filter::from_name("Sepia", 5), Filter::Sepia);
        assert_eq!(Filter::from_name("blur", 7), Filter::Blur { kernel: 7 });
    }

    #[test]
    fn invert_twice_round_trips_exactly() {
        let frame = scene(24, 24);
        let twice = apply(&apply(&frame, Filter::Invert), Filter::Invert);
        assert_eq!(twice, frame);
    }

    #[test]
    fn grayscale_is_idempotent() {
        let frame = scene(24, 24);
        let once = apply(&frame, Filter::Grayscale);
        let twice = apply(&once, Filter::Grayscale);
        assert_eq!(once, twice);
    }

    #[test]
    fn grayscale_output_has_equal_channels() {
        let out = apply(&scene(16, 16), Filter::Grayscale);
        assert!(out.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }

    #[test]
    fn binary_output_is_two_valued() {
        let out = apply(&scene(24, 24), Filter::Binary);
        assert!(out
            .pixels()
            .all(|p| p.0 == [0, 0, 0] || p.0 == [255, 255, 255]));
    }

    #[test]
    fn sepia_saturates_on_white() {
        let white = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let out = apply(&white, Filter::Sepia);
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn sepia_on_black_stays_black() {
        let black = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let out = apply(&black, Filter::Sepia);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn transforms_preserve_dimensions() {
        let frame = scene(40, 30);
        for filter in [
            Filter::Grayscale,
            Filter::Sepia,
            Filter::Blur { kernel: 8 },
            Filter::Sharpen,
            Filter::Invert,
            Filter::Cartoon,
            Filter::Sketch { kernel: 21 },
            Filter::Emboss,
            Filter::Binary,
        ] {
            let out = apply(&frame, filter);
            assert_eq!(out.dimensions(), frame.dimensions(), "{}", filter.name());
        }
    }

    #[test]
    fn kernel_normalization_forces_odd_in_range() {
        assert_eq!(normalize_kernel(0), 1);
        assert_eq!(normalize_kernel(4), 5);
        assert_eq!(normalize_kernel(7), 7);
        assert_eq!(normalize_kernel(31), 31);
        assert_eq!(normalize_kernel(200), 31);
    }

    #[test]
    fn sketch_output_is_grayscale() {
        let out = apply(&scene(20, 20), Filter::Sketch { kernel: 5 });
        assert!(out.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }

    #[test]
    fn blur_with_unit_kernel_is_identity() {
        let frame = scene(16, 16);
        assert_eq!(apply(&frame, Filter::Blur { kernel: 1 }), frame);
    }
}
