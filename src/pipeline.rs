//! The per-tick frame orchestrator.
//!
//! A periodic clock drives [`Pipeline::tick`]; each tick pulls one frame,
//! updates the rate estimate, feeds the recorder the raw mirrored feed,
//! runs the ROI-aware processing chain, draws overlays, and hands the result
//! to the display sink. Operator input (filter selection, ROI gestures,
//! recording toggles) mutates pipeline state between ticks; each tick reads
//! one self-consistent `FilterConfig` snapshot.
//!
//! Stage failures stay contained: a failed capture skips the tick, a failed
//! recorder write is logged without touching the display path, and filter
//! application is total by construction.

use anyhow::Result;
use image::RgbImage;
use std::path::PathBuf;

use crate::capture::{CaptureConfig, CaptureSource, CaptureStats};
use crate::config::DaemonConfig;
use crate::detect::{detect_edges, DetectParams, FaceDetector};
use crate::filters::{self, Filter};
use crate::frame::{composite_roi, crop_roi, mirror};
use crate::overlay;
use crate::rate::RateEstimator;
use crate::record::Recorder;
use crate::roi::{Roi, RoiSelector, ViewportMapper};
use crate::storage;

/// Edge detection thresholds, both in `[0, 255]`, no ordering enforced.
#[derive(Clone, Copy, Debug)]
pub struct EdgeParams {
    pub low: u8,
    pub high: u8,
}

/// The per-tick processing configuration snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterConfig {
    pub filter: Filter,
    pub edges: Option<EdgeParams>,
    pub faces: Option<DetectParams>,
}

/// Where processed frames go. The sink owns presentation concerns
/// (color-space conversion, scaling, letterboxing).
pub trait DisplaySink {
    fn present(&mut self, frame: &RgbImage, rate: f64);
}

/// What one tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was processed and handed to the sink.
    Presented,
    /// The tick was skipped (capture failure, or paused with no frame yet).
    Skipped,
}

pub struct Pipeline {
    source: CaptureSource,
    selector: RoiSelector,
    config: FilterConfig,
    recorder: Recorder,
    rate: RateEstimator,
    face_detector: FaceDetector,
    snapshots_dir: PathBuf,
    prefix: String,
    paused: bool,
    /// Mirrored, unfiltered copy of the newest capture.
    last_raw: Option<RgbImage>,
    /// Last frame handed to the sink.
    current: Option<RgbImage>,
    consecutive_capture_failures: u64,
}

impl Pipeline {
    pub fn new(cfg: &DaemonConfig) -> Result<Self> {
        let source = CaptureSource::new(cfg.capture.clone())?;
        let recorder = Recorder::new(
            cfg.output.recordings_dir.as_ref(),
            &cfg.output.prefix,
            cfg.record_fps,
        );
        Ok(Self {
            source,
            selector: RoiSelector::new(),
            config: FilterConfig::default(),
            recorder,
            rate: RateEstimator::default(),
            face_detector: FaceDetector::cpu(),
            snapshots_dir: PathBuf::from(&cfg.output.snapshots_dir),
            prefix: cfg.output.prefix.clone(),
            paused: false,
            last_raw: None,
            current: None,
            consecutive_capture_failures: 0,
        })
    }

    /// Opens the capture device. Failure here is fatal for startup; the
    /// caller decides whether to abort or fall back.
    pub fn connect(&mut self) -> Result<()> {
        self.source.connect()
    }

    /// Runs one clock tick.
    pub fn tick(&mut self, sink: &mut dyn DisplaySink) -> Result<TickOutcome> {
        if self.paused {
            // Re-render the retained frame so filter/ROI changes stay live
            // while the feed is frozen.
            let Some(raw) = self.last_raw.clone() else {
                return Ok(TickOutcome::Skipped);
            };
            let out = self.render(&raw)?;
            sink.present(&out, self.rate.current());
            self.current = Some(out);
            return Ok(TickOutcome::Presented);
        }

        let frame = match self.source.next_frame() {
            Ok(frame) => {
                if self.consecutive_capture_failures > 0 {
                    log::info!(
                        "capture recovered after {} failed ticks",
                        self.consecutive_capture_failures
                    );
                    self.consecutive_capture_failures = 0;
                }
                frame
            }
            Err(err) => {
                // Transient: report the start of a failure streak once and
                // leave all pipeline state untouched.
                if self.consecutive_capture_failures == 0 {
                    log::warn!("failed to capture frame: {err:#}");
                }
                self.consecutive_capture_failures += 1;
                return Ok(TickOutcome::Skipped);
            }
        };

        let rate = self.rate.update();

        let raw = mirror(&frame.image);
        if self.recorder.is_recording() {
            // The recorder gets the raw feed: mirrored, never filtered.
            if let Err(err) = self.recorder.write_frame(&raw) {
                log::warn!("failed to write recorded frame: {err:#}");
            }
        }

        let out = self.render(&raw)?;
        sink.present(&out, rate);
        self.last_raw = Some(raw);
        self.current = Some(out);
        Ok(TickOutcome::Presented)
    }

    /// Runs the processing stages inside the committed ROI when one exists,
    /// or over the whole frame otherwise, then draws the overlays.
    fn render(&mut self, raw: &RgbImage) -> Result<RgbImage> {
        let cfg = self.config;
        let mut out = match self.selector.get_roi() {
            Some(roi) => {
                let region = crop_roi(raw, roi);
                let processed = self.process(&region, &cfg)?;
                composite_roi(raw, &processed, self.clamped_roi(roi, raw))
            }
            None => self.process(raw, &cfg)?,
        };
        overlay::draw_selection(&mut out, &self.selector);
        Ok(out)
    }

    fn process(&mut self, frame: &RgbImage, cfg: &FilterConfig) -> Result<RgbImage> {
        let mut out = filters::apply(frame, cfg.filter);
        if let Some(edges) = cfg.edges {
            out = detect_edges(&out, edges.low, edges.high, None);
        }
        if let Some(faces) = cfg.faces {
            let (overlaid, _boxes) = self.face_detector.detect_faces(&out, &faces)?;
            out = overlaid;
        }
        Ok(out)
    }

    // crop_roi clamps the cut to the frame; the composite position must use
    // the same clamped origin or a stale ROI from a larger source resolution
    // would paste out of place.
    fn clamped_roi(&self, roi: Roi, frame: &RgbImage) -> Roi {
        Roi {
            x1: roi.x1.min(frame.width().saturating_sub(1)),
            y1: roi.y1.min(frame.height().saturating_sub(1)),
            x2: roi.x2.min(frame.width()),
            y2: roi.y2.min(frame.height()),
        }
    }

    // ---- operator input -----------------------------------------------

    pub fn filter_config(&self) -> FilterConfig {
        self.config
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.config.filter = filter;
    }

    pub fn set_edges(&mut self, edges: Option<EdgeParams>) {
        self.config.edges = edges;
    }

    pub fn set_faces(&mut self, faces: Option<DetectParams>) {
        self.config.faces = faces;
    }

    /// Maps a pointer position on the display surface into image pixels,
    /// matching the sink's aspect-fit presentation.
    pub fn map_display_point(&self, display: (f64, f64), surface: (u32, u32)) -> (u32, u32) {
        let image_size = self
            .last_raw
            .as_ref()
            .map(|f| f.dimensions())
            .unwrap_or((1, 1));
        ViewportMapper::new(image_size, surface).to_image(display.0, display.1)
    }

    pub fn selector(&self) -> &RoiSelector {
        &self.selector
    }

    /// ROI gesture entry points, in image-space coordinates (see
    /// [`Pipeline::map_display_point`]).
    pub fn begin_roi(&mut self, point: (u32, u32)) {
        self.selector.start_selection(point);
    }

    pub fn drag_roi(&mut self, point: (u32, u32)) {
        self.selector.update_selection(point);
    }

    pub fn end_roi(&mut self) {
        self.selector.finish_selection();
    }

    pub fn clear_roi(&mut self) {
        self.selector.clear_selection();
    }

    pub fn roi(&self) -> Option<Roi> {
        self.selector.get_roi()
    }

    // ---- playback / persistence ---------------------------------------

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Freezes or resumes capture. Returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recording_time(&self) -> u64 {
        self.recorder.get_recording_time()
    }

    /// Starts recording at the current frame size. A reported no-op when no
    /// frame has been captured yet or a session is already running.
    pub fn start_recording(&mut self) -> Result<Option<PathBuf>> {
        let Some(raw) = self.last_raw.as_ref() else {
            log::warn!("no frame available for recording");
            return Ok(None);
        };
        self.recorder.start_recording(raw.dimensions())
    }

    pub fn stop_recording(&mut self) -> Result<Option<PathBuf>> {
        self.recorder.stop_recording()
    }

    /// Writes the currently displayed frame to the snapshots directory.
    /// A reported no-op before the first presented frame.
    pub fn snapshot(&mut self) -> Result<Option<PathBuf>> {
        let Some(frame) = self.current.as_ref() else {
            log::warn!("no frame available for snapshot");
            return Ok(None);
        };
        let path = storage::write_snapshot(&self.snapshots_dir, &self.prefix, frame)?;
        log::info!("snapshot saved: {}", path.display());
        Ok(Some(path))
    }

    /// Tears down the active source and opens `config` instead. On failure
    /// the previous source is kept, so the feed survives a bad switch.
    /// Any committed ROI or running recording is unaffected.
    pub fn switch_source(&mut self, config: CaptureConfig) -> Result<()> {
        let mut next = CaptureSource::new(config)?;
        next.connect()?;
        self.source = next;
        self.consecutive_capture_failures = 0;
        Ok(())
    }

    pub fn capture_stats(&self) -> CaptureStats {
        self.source.stats()
    }

    pub fn is_capture_healthy(&self) -> bool {
        self.source.is_healthy()
    }

    /// The last presented (processed, overlaid) frame.
    pub fn current_frame(&self) -> Option<&RgbImage> {
        self.current.as_ref()
    }

    /// The last raw (mirrored, unfiltered) capture.
    pub fn current_raw(&self) -> Option<&RgbImage> {
        self.last_raw.as_ref()
    }
}

/// Test/headless sink that retains the frames it was handed.
#[derive(Default)]
pub struct CollectingSink {
    pub frames: Vec<RgbImage>,
    pub last_rate: f64,
}

impl DisplaySink for CollectingSink {
    fn present(&mut self, frame: &RgbImage, rate: f64) {
        self.frames.push(frame.clone());
        self.last_rate = rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaemonConfig;

    fn stub_pipeline(device: &str) -> Pipeline {
        let mut cfg = DaemonConfig::default();
        cfg.capture.device = device.to_string();
        cfg.capture.width = 160;
        cfg.capture.height = 120;
        let mut pipeline = Pipeline::new(&cfg).expect("pipeline");
        pipeline.connect().expect("connect");
        pipeline
    }

    #[test]
    fn tick_presents_a_frame_and_retains_it() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        let mut sink = CollectingSink::default();
        assert_eq!(pipeline.tick(&mut sink)?, TickOutcome::Presented);
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0].dimensions(), (160, 120));
        assert!(pipeline.current_frame().is_some());
        assert!(pipeline.current_raw().is_some());
        Ok(())
    }

    #[test]
    fn presented_frame_is_mirrored() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        let mut sink = CollectingSink::default();
        pipeline.tick(&mut sink)?;
        // No filter configured: the presented frame equals the raw mirror.
        assert_eq!(&sink.frames[0], pipeline.current_raw().unwrap());
        Ok(())
    }

    #[test]
    fn capture_failure_skips_the_tick_without_state_changes() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://flaky");
        let mut sink = CollectingSink::default();
        assert_eq!(pipeline.tick(&mut sink)?, TickOutcome::Presented);
        assert_eq!(pipeline.tick(&mut sink)?, TickOutcome::Presented);
        let retained = pipeline.current_frame().cloned();
        // Third synthetic read fails.
        assert_eq!(pipeline.tick(&mut sink)?, TickOutcome::Skipped);
        assert_eq!(sink.frames.len(), 2);
        assert_eq!(pipeline.current_frame().cloned(), retained);
        Ok(())
    }

    #[test]
    fn pause_rerenders_without_capturing() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        let mut sink = CollectingSink::default();
        pipeline.tick(&mut sink)?;
        assert_eq!(pipeline.capture_stats().frames_captured, 1);

        assert!(pipeline.toggle_pause());
        assert_eq!(pipeline.tick(&mut sink)?, TickOutcome::Presented);
        assert_eq!(pipeline.tick(&mut sink)?, TickOutcome::Presented);
        // Paused ticks pull nothing new from the source.
        assert_eq!(pipeline.capture_stats().frames_captured, 1);

        assert!(!pipeline.toggle_pause());
        pipeline.tick(&mut sink)?;
        assert_eq!(pipeline.capture_stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn pause_before_any_frame_skips() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        let mut sink = CollectingSink::default();
        pipeline.toggle_pause();
        assert_eq!(pipeline.tick(&mut sink)?, TickOutcome::Skipped);
        assert!(sink.frames.is_empty());
        Ok(())
    }

    #[test]
    fn committed_roi_confines_the_filter() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        let mut sink = CollectingSink::default();
        pipeline.tick(&mut sink)?;

        pipeline.set_filter(Filter::Invert);
        pipeline.begin_roi((20, 20));
        pipeline.drag_roi((80, 80));
        pipeline.end_roi();
        assert!(pipeline.roi().is_some());

        pipeline.tick(&mut sink)?;
        let out = sink.frames.last().unwrap();
        let raw = pipeline.current_raw().unwrap();

        // Outside the ROI (and its overlay) the mirror survives untouched.
        assert_eq!(out.get_pixel(120, 100), raw.get_pixel(120, 100));
        // Inside, pixels are inverted.
        let inside = raw.get_pixel(40, 40).0;
        assert_eq!(
            out.get_pixel(40, 40).0,
            [255 - inside[0], 255 - inside[1], 255 - inside[2]]
        );
        Ok(())
    }

    #[test]
    fn clearing_the_roi_restores_whole_frame_processing() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        let mut sink = CollectingSink::default();
        pipeline.set_filter(Filter::Invert);
        pipeline.begin_roi((20, 20));
        pipeline.drag_roi((80, 80));
        pipeline.end_roi();
        pipeline.clear_roi();
        pipeline.tick(&mut sink)?;

        let out = sink.frames.last().unwrap();
        let raw = pipeline.current_raw().unwrap();
        let corner = raw.get_pixel(150, 110).0;
        assert_eq!(
            out.get_pixel(150, 110).0,
            [255 - corner[0], 255 - corner[1], 255 - corner[2]]
        );
        Ok(())
    }

    #[test]
    fn recording_requires_a_captured_frame() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        assert!(pipeline.start_recording()?.is_none());
        assert!(!pipeline.is_recording());
        Ok(())
    }

    #[test]
    fn snapshot_requires_a_presented_frame() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        assert!(pipeline.snapshot()?.is_none());
        Ok(())
    }

    #[test]
    fn switch_source_failure_keeps_the_previous_device() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        let mut sink = CollectingSink::default();
        pipeline.tick(&mut sink)?;

        #[cfg(not(feature = "capture-v4l2"))]
        {
            let bad = CaptureConfig {
                device: "/dev/video99".to_string(),
                ..CaptureConfig::default()
            };
            assert!(pipeline.switch_source(bad).is_err());
        }
        // The old source still delivers.
        assert_eq!(pipeline.tick(&mut sink)?, TickOutcome::Presented);
        Ok(())
    }

    #[test]
    fn map_display_point_is_identity_at_native_size() -> Result<()> {
        let mut pipeline = stub_pipeline("stub://camera");
        let mut sink = CollectingSink::default();
        pipeline.tick(&mut sink)?;
        assert_eq!(
            pipeline.map_display_point((50.0, 60.0), (160, 120)),
            (50, 60)
        );
        Ok(())
    }
}
