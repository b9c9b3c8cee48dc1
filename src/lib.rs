//! VisionDesk frame-processing core.
//!
//! This crate implements the capture-to-display pipeline behind the VisionDesk
//! camera workstation: a periodic tick pulls a frame, mirrors it for the
//! operator, feeds the recorder, applies the selected filter chain inside an
//! optional region of interest, and hands the overlaid result to a display
//! sink.
//!
//! # Module Structure
//!
//! - `capture`: frame sources (V4L2 devices behind a feature gate, synthetic
//!   `stub://` sources for tests and headless runs)
//! - `pipeline`: the per-tick orchestrator and display-sink seam
//! - `filters`: the selectable per-frame transforms
//! - `roi`: region-of-interest selection state machine and viewport mapping
//! - `detect`: edge detection and the pluggable face-detector backends
//! - `record` / `storage`: MJPEG recording sessions and snapshot persistence
//! - `overlay` / `rate`: on-frame annotations and the frame-rate estimate

pub mod capture;
pub mod config;
pub mod detect;
pub mod filters;
pub mod frame;
pub mod overlay;
pub mod pipeline;
pub mod rate;
pub mod record;
pub mod roi;
pub mod storage;

pub use capture::{CaptureConfig, CaptureSource, CaptureStats};
pub use config::DaemonConfig;
pub use detect::{detect_edges, DetectParams, DetectorBackend, FaceBox, FaceDetector};
pub use filters::Filter;
pub use frame::CapturedFrame;
pub use pipeline::{
    CollectingSink, DisplaySink, EdgeParams, FilterConfig, Pipeline, TickOutcome,
};
pub use rate::RateEstimator;
pub use record::Recorder;
pub use roi::{Roi, RoiSelector, SelectionState, ViewportMapper, MIN_ROI_EDGE};
