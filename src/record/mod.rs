//! Video recording: `Stopped ⇄ Recording` state machine over the AVI writer.
//!
//! The recorder always receives the raw (unfiltered) feed from the
//! orchestrator. Both `start_recording` and `stop_recording` are silent
//! no-ops when called in the wrong state, so the operator can mash the
//! record button without corrupting a session.

mod avi;

pub use avi::AviWriter;

use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ExtendedColorType, RgbImage};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::storage;

/// Default container frame rate.
pub const DEFAULT_RECORD_FPS: u32 = 30;

const JPEG_QUALITY: u8 = 85;

struct RecordingSession {
    writer: AviWriter,
    width: u32,
    height: u32,
    started_at: Instant,
    path: PathBuf,
}

/// Recording state machine. One session at a time; each session owns its
/// writer handle exclusively and releases it on stop or drop.
pub struct Recorder {
    dir: PathBuf,
    prefix: String,
    fps: u32,
    session: Option<RecordingSession>,
}

impl Recorder {
    pub fn new(dir: &Path, prefix: &str, fps: u32) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            fps: fps.max(1),
            session: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Opens a new timestamped container for `frame_size` frames and starts
    /// the session clock. No-op (returning `None`) while already recording.
    pub fn start_recording(&mut self, frame_size: (u32, u32)) -> Result<Option<PathBuf>> {
        if self.session.is_some() {
            return Ok(None);
        }
        storage::ensure_dir(&self.dir)?;
        let stem = format!("{}_{}", self.prefix, storage::timestamp());
        let path = storage::unique_path(&self.dir, &stem, "avi");
        let writer = AviWriter::create(&path, frame_size.0, frame_size.1, self.fps)?;
        log::info!("recording started: {}", path.display());
        self.session = Some(RecordingSession {
            writer,
            width: frame_size.0,
            height: frame_size.1,
            started_at: Instant::now(),
            path: path.clone(),
        });
        Ok(Some(path))
    }

    /// Appends a frame to the active session; no-op when stopped.
    ///
    /// A frame whose size differs from the session's fixed size is resized to
    /// match, so a mid-session device resolution change cannot corrupt the
    /// container.
    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let resized;
        let frame = if frame.dimensions() != (session.width, session.height) {
            resized = imageops::resize(
                frame,
                session.width,
                session.height,
                imageops::FilterType::Triangle,
            );
            &resized
        } else {
            frame
        };

        let mut jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
        encoder.encode(
            frame.as_raw(),
            session.width,
            session.height,
            ExtendedColorType::Rgb8,
        )?;
        session.writer.write_frame(&jpeg)
    }

    /// Finalizes the container and returns its path; `None` when stopped.
    pub fn stop_recording(&mut self) -> Result<Option<PathBuf>> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };
        let frames = session.writer.frames_written();
        session.writer.finalize()?;
        log::info!(
            "recording saved: {} ({} frames)",
            session.path.display(),
            frames
        );
        Ok(Some(session.path))
    }

    /// Elapsed whole seconds of the active session, or 0 when stopped.
    pub fn get_recording_time(&self) -> u64 {
        self.session
            .as_ref()
            .map(|s| s.started_at.elapsed().as_secs())
            .unwrap_or(0)
    }
}
