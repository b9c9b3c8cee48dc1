//! V4L2 device capture backend.
//!
//! Requests RGB24 at the configured size; if the driver refuses the format
//! or size, whatever the device settles on is used and reported. The device
//! and its mmap stream are held in one self-referencing state object so the
//! handle is released as a unit when the source is dropped or reconnected.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::{CaptureConfig, CaptureStats};
use crate::frame::CapturedFrame;

pub(super) struct DeviceCapture {
    config: CaptureConfig,
    state: Option<DeviceState>,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceCapture {
    pub(super) fn new(config: CaptureConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        // Reconnecting drops any previous handle first.
        self.state = None;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open capture device {}", self.config.device))?;
        let mut format = device.format().context("read capture format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CaptureSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read capture format after set failure")?
            }
        };
        if &format.fourcc.repr != b"RGB3" {
            return Err(anyhow!(
                "device {} does not support RGB24 capture (got {})",
                self.config.device,
                format.fourcc
            ));
        }

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CaptureSource: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create capture buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "CaptureSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    pub(super) fn next_frame(&mut self) -> Result<CapturedFrame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("capture device not connected")?;
        let (buf, _meta) = state
            .with_stream_mut(|stream| stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture frame")
            })?;

        let expected = self.active_width as usize * self.active_height as usize * 3;
        if buf.len() < expected {
            return Err(anyhow!(
                "short capture buffer: expected {} bytes, got {}",
                expected,
                buf.len()
            ));
        }
        let image = RgbImage::from_raw(
            self.active_width,
            self.active_height,
            buf[..expected].to_vec(),
        )
        .ok_or_else(|| anyhow!("capture buffer does not match frame dimensions"))?;

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        Ok(CapturedFrame::new(image, self.frame_count))
    }

    pub(super) fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    pub(super) fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}
