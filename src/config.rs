//! Daemon configuration: JSON file plus `VISIONDESK_*` environment overrides.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::capture::CaptureConfig;

const DEFAULT_DEVICE: &str = "stub://camera";
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_TICK_MS: u64 = 30;
const DEFAULT_RECORD_FPS: u32 = 30;
const DEFAULT_RECORDINGS_DIR: &str = "recordings";
const DEFAULT_SNAPSHOTS_DIR: &str = "snapshots";
const DEFAULT_PREFIX: &str = "visiondesk";

#[derive(Debug, Deserialize, Default)]
struct DaemonConfigFile {
    capture: Option<CaptureConfigFile>,
    output: Option<OutputConfigFile>,
    record_fps: Option<u32>,
    tick_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    recordings_dir: Option<String>,
    snapshots_dir: Option<String>,
    prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub capture: CaptureConfig,
    pub output: OutputSettings,
    pub record_fps: u32,
    pub tick: Duration,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub recordings_dir: String,
    pub snapshots_dir: String,
    pub prefix: String,
}

impl DaemonConfig {
    /// Loads from the file named by `VISIONDESK_CONFIG` (if set), then applies
    /// environment overrides, then validates.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("VISIONDESK_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DaemonConfigFile) -> Self {
        let capture = CaptureConfig {
            device: file
                .capture
                .as_ref()
                .and_then(|c| c.device.clone())
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            target_fps: file
                .capture
                .as_ref()
                .and_then(|c| c.target_fps)
                .unwrap_or(DEFAULT_TARGET_FPS),
            width: file
                .capture
                .as_ref()
                .and_then(|c| c.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .capture
                .as_ref()
                .and_then(|c| c.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        let output = OutputSettings {
            recordings_dir: file
                .output
                .as_ref()
                .and_then(|o| o.recordings_dir.clone())
                .unwrap_or_else(|| DEFAULT_RECORDINGS_DIR.to_string()),
            snapshots_dir: file
                .output
                .as_ref()
                .and_then(|o| o.snapshots_dir.clone())
                .unwrap_or_else(|| DEFAULT_SNAPSHOTS_DIR.to_string()),
            prefix: file
                .output
                .as_ref()
                .and_then(|o| o.prefix.clone())
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
        };
        Self {
            capture,
            output,
            record_fps: file.record_fps.unwrap_or(DEFAULT_RECORD_FPS),
            tick: Duration::from_millis(file.tick_ms.unwrap_or(DEFAULT_TICK_MS)),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("VISIONDESK_DEVICE") {
            self.capture.device = device;
        }
        if let Ok(fps) = std::env::var("VISIONDESK_TARGET_FPS") {
            self.capture.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("VISIONDESK_TARGET_FPS must be an integer"))?;
        }
        if let Ok(dir) = std::env::var("VISIONDESK_RECORDINGS_DIR") {
            self.output.recordings_dir = dir;
        }
        if let Ok(dir) = std::env::var("VISIONDESK_SNAPSHOTS_DIR") {
            self.output.snapshots_dir = dir;
        }
        if let Ok(fps) = std::env::var("VISIONDESK_RECORD_FPS") {
            self.record_fps = fps
                .parse()
                .map_err(|_| anyhow!("VISIONDESK_RECORD_FPS must be an integer"))?;
        }
        if let Ok(tick) = std::env::var("VISIONDESK_TICK_MS") {
            let ms: u64 = tick
                .parse()
                .map_err(|_| anyhow!("VISIONDESK_TICK_MS must be an integer"))?;
            self.tick = Duration::from_millis(ms);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture size must be non-zero"));
        }
        if self.record_fps == 0 {
            return Err(anyhow!("record_fps must be non-zero"));
        }
        if self.tick.is_zero() {
            return Err(anyhow!("tick_ms must be non-zero"));
        }
        if self.output.prefix.is_empty() {
            return Err(anyhow!("output prefix must be non-empty"));
        }
        Ok(())
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_file(DaemonConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<DaemonConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = DaemonConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.capture.device, DEFAULT_DEVICE);
        assert_eq!(cfg.tick, Duration::from_millis(DEFAULT_TICK_MS));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let mut cfg = DaemonConfig::default();
        cfg.tick = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let mut cfg = DaemonConfig::default();
        cfg.output.prefix = String::new();
        assert!(cfg.validate().is_err());
    }
}
