//! CPU face detection backend.
//!
//! A dependency-free multi-scale sliding-window detector. Each square window
//! is scored with a Haar-like contrast test (the eye band of a face is darker
//! than the cheek band below it), candidates from every pyramid level are
//! pooled, and overlapping candidates are merged with min-neighbors grouping.
//! Windows grow by the configured scale factor per pyramid level and never
//! shrink below `min_size`.
//!
//! This is a coarse heuristic, not a trained cascade. It exists so the
//! pipeline has a real, deterministic detector with the exact contract a
//! cascade-based backend would have.

use anyhow::Result;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, sum_image_pixels};

use crate::detect::backend::{DetectParams, DetectorBackend};
use crate::detect::result::FaceBox;

type Integral = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Fixed neighbor count required to keep a candidate cluster.
pub const MIN_NEIGHBORS: usize = 5;

// Candidate windows must show at least this much eye-band/cheek-band
// luminance contrast.
const BAND_CONTRAST: f32 = 10.0;

#[derive(Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DetectorBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn detect(&mut self, gray: &GrayImage, params: &DetectParams) -> Result<Vec<FaceBox>> {
        let (w, h) = gray.dimensions();
        let min_window = params.min_size.max(16);
        if min_window > w.min(h) {
            return Ok(Vec::new());
        }

        let scale = params.scale_factor();
        // One integral image makes every window sum a four-corner lookup.
        let integral: Integral = integral_image::<_, u32>(gray);
        let mut candidates = Vec::new();
        let mut window = min_window as f32;
        while (window as u32) <= w.min(h) {
            let win = window as u32;
            let step = (win / 8).max(2);
            let mut y = 0;
            while y + win <= h {
                let mut x = 0;
                while x + win <= w {
                    if face_like(&integral, x, y, win) {
                        candidates.push(FaceBox::new(x, y, win, win));
                    }
                    x += step;
                }
                y += step;
            }
            window *= scale;
        }

        Ok(group_rectangles(&candidates, MIN_NEIGHBORS))
    }
}

/// Scores one window: mid-range overall brightness plus eye-band/cheek-band
/// contrast.
fn face_like(integral: &Integral, x: u32, y: u32, win: u32) -> bool {
    let overall = band_mean(integral, x, y + win / 10, win, win - win / 5);
    if !(40.0..=220.0).contains(&overall) {
        return false;
    }
    let eyes = band_mean(integral, x, y + win / 4, win, win / 5);
    let cheeks = band_mean(integral, x, y + win / 2 + win / 20, win, win * 3 / 10);
    cheeks - eyes >= BAND_CONTRAST
}

// `integral` is one pixel larger than the source image in each dimension, so
// the source bounds are its dimensions minus one.
fn band_mean(integral: &Integral, x: u32, y: u32, width: u32, height: u32) -> f32 {
    let (gw, gh) = (integral.width() - 1, integral.height() - 1);
    if width == 0 || height == 0 || x >= gw || y >= gh {
        return 0.0;
    }
    let right = (x + width - 1).min(gw - 1);
    let bottom = (y + height - 1).min(gh - 1);
    let sum = sum_image_pixels(integral, x, y, right, bottom)[0];
    let count = (right - x + 1) as u64 * (bottom - y + 1) as u64;
    sum as f32 / count as f32
}

/// Merges overlapping candidate boxes, keeping clusters with at least
/// `min_neighbors` members and returning each cluster's average box.
pub(crate) fn group_rectangles(candidates: &[FaceBox], min_neighbors: usize) -> Vec<FaceBox> {
    struct Cluster {
        sum_x: u64,
        sum_y: u64,
        sum_w: u64,
        sum_h: u64,
        count: usize,
    }

    let mut clusters: Vec<Cluster> = Vec::new();
    for cand in candidates {
        let found = clusters.iter_mut().find(|cl| {
            let cx = (cl.sum_x / cl.count as u64) as i64;
            let cy = (cl.sum_y / cl.count as u64) as i64;
            let cw = (cl.sum_w / cl.count as u64) as i64;
            // Two boxes are neighbors when position and size agree within
            // 20% of the mean edge length.
            let eps = ((cw + cand.width as i64) / 2) / 5;
            (cand.x as i64 - cx).abs() <= eps
                && (cand.y as i64 - cy).abs() <= eps
                && (cand.width as i64 - cw).abs() <= eps
        });
        match found {
            Some(cl) => {
                cl.sum_x += cand.x as u64;
                cl.sum_y += cand.y as u64;
                cl.sum_w += cand.width as u64;
                cl.sum_h += cand.height as u64;
                cl.count += 1;
            }
            None => clusters.push(Cluster {
                sum_x: cand.x as u64,
                sum_y: cand.y as u64,
                sum_w: cand.width as u64,
                sum_h: cand.height as u64,
                count: 1,
            }),
        }
    }

    clusters
        .into_iter()
        .filter(|cl| cl.count >= min_neighbors)
        .map(|cl| {
            let n = cl.count as u64;
            FaceBox::new(
                (cl.sum_x / n) as u32,
                (cl.sum_y / n) as u32,
                (cl.sum_w / n) as u32,
                (cl.sum_h / n) as u32,
            )
        })
        .collect()
}
