//! Region-aware two-threshold edge detection.

use image::{imageops, RgbImage};
use imageproc::edges::canny;

use crate::frame::{composite_roi, crop_roi, expand_gray};
use crate::roi::Roi;

/// Canny edge mapping over the whole frame or just the ROI.
///
/// With a ROI, the edge map overwrites only that sub-rectangle in a copy of
/// the input; without one, the whole frame becomes the edge map. Both
/// thresholds accept anything in `[0, 255]` with no ordering requirement:
/// `low > high` is resolved by swapping the pair, so it behaves as
/// `(min, max)`, and a zero threshold is raised to 1.
pub fn detect_edges(frame: &RgbImage, low: u8, high: u8, roi: Option<Roi>) -> RgbImage {
    let (low, high) = if low > high { (high, low) } else { (low, high) };
    // Hysteresis with a zero low threshold accepts every pixel and walks off
    // the image border; 1 is the smallest usable value.
    let low = low.max(1);
    let high = high.max(low);

    match roi {
        Some(roi) => {
            let region = crop_roi(frame, roi);
            let edges = edge_map(&region, low, high);
            composite_roi(frame, &edges, roi)
        }
        None => edge_map(frame, low, high),
    }
}

fn edge_map(frame: &RgbImage, low: u8, high: u8) -> RgbImage {
    let gray = imageops::grayscale(frame);
    expand_gray(&canny(&gray, low as f32, high as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn black_input_yields_black_output() {
        let black = RgbImage::from_pixel(64, 48, Rgb([0, 0, 0]));
        let out = detect_edges(&black, 50, 150, None);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn inverted_thresholds_behave_like_sorted_pair() {
        let frame = RgbImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let sorted = detect_edges(&frame, 50, 150, None);
        let swapped = detect_edges(&frame, 150, 50, None);
        assert_eq!(sorted, swapped);
    }

    #[test]
    fn roi_limits_the_edge_map_to_the_rectangle() {
        // Vertical contrast edge across the whole frame.
        let frame = RgbImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                Rgb([10, 10, 10])
            } else {
                Rgb([240, 240, 240])
            }
        });
        let roi = Roi {
            x1: 16,
            y1: 16,
            x2: 48,
            y2: 48,
        };
        let out = detect_edges(&frame, 50, 150, Some(roi));

        // Outside the ROI the original pixels survive.
        assert_eq!(out.get_pixel(0, 0), frame.get_pixel(0, 0));
        assert_eq!(out.get_pixel(63, 63), frame.get_pixel(63, 63));
        // Inside, the buffer is an edge map: pure black or white only.
        for y in 16..48 {
            for x in 16..48 {
                let p = out.get_pixel(x, y).0;
                assert!(p == [0, 0, 0] || p == [255, 255, 255]);
            }
        }
    }

    #[test]
    fn whole_frame_mode_replaces_everything() {
        let frame = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 100]));
        let out = detect_edges(&frame, 50, 150, None);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0] || p.0 == [255, 255, 255]));
    }

    #[test]
    fn zero_thresholds_are_raised_to_one() {
        let frame = RgbImage::from_fn(64, 64, |x, _| {
            if x < 32 {
                Rgb([10, 10, 10])
            } else {
                Rgb([240, 240, 240])
            }
        });
        // A zero low threshold behaves like 1 instead of flooding the frame.
        assert_eq!(
            detect_edges(&frame, 0, 150, None),
            detect_edges(&frame, 1, 150, None)
        );

        let gradient = RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 100]));
        let out = detect_edges(&gradient, 0, 0, None);
        assert_eq!(out.dimensions(), gradient.dimensions());
        // The swap path hits the same floor.
        assert_eq!(detect_edges(&gradient, 255, 0, None).dimensions(), (32, 32));
    }
}
