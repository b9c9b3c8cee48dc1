//! Frame capture sources.
//!
//! A `CaptureSource` yields the next raw RGB frame from a device and owns the
//! device handle for its lifetime. Two backends:
//! - Synthetic, selected by `stub://` device paths: deterministic generated
//!   scenes, always available, used by tests and demos. `stub://flaky`
//!   simulates a device with transient read failures.
//! - V4L2 (feature `capture-v4l2`): real `/dev/video*` devices.
//!
//! Capture must not stall the tick loop: a failed read surfaces as an error
//! for the orchestrator to skip the tick on, never as a hang.

#[cfg(feature = "capture-v4l2")]
mod v4l2;

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

use crate::frame::CapturedFrame;

/// Configuration for a capture source.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Device path (e.g. "/dev/video0") or a `stub://` scene name.
    pub device: String,
    /// Requested frame rate; best-effort on real devices.
    pub target_fps: u32,
    /// Requested frame width; best-effort on real devices.
    pub width: u32,
    /// Requested frame height; best-effort on real devices.
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "stub://camera".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

/// Statistics for a capture source.
#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub device: String,
}

/// A camera abstraction with exclusive ownership of the device handle.
pub struct CaptureSource {
    backend: CaptureBackend,
}

enum CaptureBackend {
    Synthetic(SyntheticCapture),
    #[cfg(feature = "capture-v4l2")]
    Device(v4l2::DeviceCapture),
}

impl CaptureSource {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("capture frame size must be non-zero"));
        }
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CaptureBackend::Synthetic(SyntheticCapture::new(config)),
            })
        } else {
            #[cfg(feature = "capture-v4l2")]
            {
                Ok(Self {
                    backend: CaptureBackend::Device(v4l2::DeviceCapture::new(config)?),
                })
            }
            #[cfg(not(feature = "capture-v4l2"))]
            {
                Err(anyhow!(
                    "device capture requires the capture-v4l2 feature (device: {})",
                    config.device
                ))
            }
        }
    }

    /// Opens the device and applies the requested resolution best-effort.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "capture-v4l2")]
            CaptureBackend::Device(source) => source.connect(),
        }
    }

    /// Captures the next frame. Errors are transient: the caller may retry
    /// on the next tick.
    pub fn next_frame(&mut self) -> Result<CapturedFrame> {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "capture-v4l2")]
            CaptureBackend::Device(source) => source.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CaptureBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "capture-v4l2")]
            CaptureBackend::Device(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> CaptureStats {
        match &self.backend {
            CaptureBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "capture-v4l2")]
            CaptureBackend::Device(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticCapture {
    config: CaptureConfig,
    frame_count: u64,
    flaky: bool,
}

impl SyntheticCapture {
    fn new(config: CaptureConfig) -> Self {
        let flaky = config.device == "stub://flaky";
        Self {
            config,
            frame_count: 0,
            flaky,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CaptureSource: connected to {} (synthetic, {}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<CapturedFrame> {
        self.frame_count += 1;
        if self.flaky && self.frame_count % 3 == 0 {
            return Err(anyhow!("synthetic capture failure"));
        }
        let image = self.generate_scene();
        Ok(CapturedFrame::new(image, self.frame_count))
    }

    /// Deterministic scene: a diagonal gradient background with a bright
    /// square that drifts one pixel per frame, so consecutive frames differ.
    fn generate_scene(&self) -> RgbImage {
        let (w, h) = (self.config.width, self.config.height);
        let seq = self.frame_count as u32;
        let square = 16.min(w / 4).max(1);
        let sx = seq % w.saturating_sub(square).max(1);
        let sy = (seq * 2) % h.saturating_sub(square).max(1);
        RgbImage::from_fn(w, h, |x, y| {
            if x >= sx && x < sx + square && y >= sy && y < sy + square {
                Rgb([230, 230, 230])
            } else {
                Rgb([
                    ((x + seq) % 256) as u8,
                    ((y + seq / 2) % 256) as u8,
                    (((x + y) / 2) % 256) as u8,
                ])
            }
        })
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CaptureConfig {
        CaptureConfig {
            device: "stub://test".to_string(),
            target_fps: 30,
            width: 320,
            height: 240,
        }
    }

    #[test]
    fn synthetic_source_produces_configured_size() -> Result<()> {
        let mut source = CaptureSource::new(stub_config())?;
        source.connect()?;
        let frame = source.next_frame()?;
        assert_eq!(frame.width(), 320);
        assert_eq!(frame.height(), 240);
        assert_eq!(frame.sequence, 1);
        Ok(())
    }

    #[test]
    fn consecutive_frames_differ() -> Result<()> {
        let mut source = CaptureSource::new(stub_config())?;
        source.connect()?;
        let a = source.next_frame()?;
        let b = source.next_frame()?;
        assert_ne!(a.image, b.image);
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn flaky_source_fails_every_third_read() -> Result<()> {
        let mut source = CaptureSource::new(CaptureConfig {
            device: "stub://flaky".to_string(),
            ..stub_config()
        })?;
        source.connect()?;
        assert!(source.next_frame().is_ok());
        assert!(source.next_frame().is_ok());
        assert!(source.next_frame().is_err());
        assert!(source.next_frame().is_ok());
        Ok(())
    }

    #[test]
    fn zero_size_config_is_rejected() {
        let config = CaptureConfig {
            width: 0,
            ..stub_config()
        };
        assert!(CaptureSource::new(config).is_err());
    }

    #[cfg(not(feature = "capture-v4l2"))]
    #[test]
    fn device_paths_require_the_v4l2_feature() {
        let config = CaptureConfig {
            device: "/dev/video0".to_string(),
            ..stub_config()
        };
        assert!(CaptureSource::new(config).is_err());
    }
}
