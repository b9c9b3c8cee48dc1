//! visiondeskd - headless VisionDesk pipeline daemon.
//!
//! Runs the capture-to-display pipeline on a fixed tick without a UI:
//! 1. Pulls frames from the configured source (V4L2 or `stub://`)
//! 2. Mirrors each frame and updates the rate estimate
//! 3. Applies the selected filter, edge pass, and face pass
//! 4. Optionally records the raw feed to an MJPEG container
//!
//! Processed frames go to a logging sink; pair it with a UI front end for
//! interactive use.

use anyhow::Result;
use clap::Parser;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use visiondesk::detect::DetectParams;
use visiondesk::pipeline::{DisplaySink, EdgeParams, Pipeline, TickOutcome};
use visiondesk::{DaemonConfig, Filter};

#[derive(Parser, Debug)]
#[command(author, version, about = "VisionDesk frame-processing daemon")]
struct Args {
    /// Capture device path, or a stub:// synthetic source.
    #[arg(long, env = "VISIONDESK_DEVICE")]
    device: Option<String>,

    /// Filter to apply (none, grayscale, sepia, blur, sharpen, invert,
    /// cartoon, sketch, emboss, binary).
    #[arg(long, default_value = "none")]
    filter: String,

    /// Kernel size for the blur and sketch filters (odd, 1..=31).
    #[arg(long, default_value = "7")]
    kernel: u32,

    /// Enable edge detection with these thresholds, given as LOW,HIGH.
    #[arg(long, value_parser = parse_edge_thresholds)]
    edges: Option<(u8, u8)>,

    /// Enable face detection.
    #[arg(long)]
    faces: bool,

    /// Minimum face size in pixels.
    #[arg(long, default_value = "30")]
    min_face_size: u32,

    /// Face detection scale step, in tenths (11..=20 maps to 1.1..=2.0).
    #[arg(long, default_value = "11")]
    scale_percent: u32,

    /// Start recording immediately.
    #[arg(long)]
    record: bool,

    /// Stop after this many presented frames (0 = run until interrupted).
    #[arg(long, default_value = "0")]
    ticks: u64,
}

fn parse_edge_thresholds(raw: &str) -> Result<(u8, u8), String> {
    let (low, high) = raw
        .split_once(',')
        .ok_or_else(|| "expected LOW,HIGH".to_string())?;
    let low = low.trim().parse::<u8>().map_err(|e| e.to_string())?;
    let high = high.trim().parse::<u8>().map_err(|e| e.to_string())?;
    Ok((low, high))
}

/// Headless sink: reports frame traffic through the logger.
struct LoggingSink {
    presented: u64,
    last_report: Instant,
}

impl LoggingSink {
    fn new() -> Self {
        Self {
            presented: 0,
            last_report: Instant::now(),
        }
    }
}

impl DisplaySink for LoggingSink {
    fn present(&mut self, frame: &RgbImage, rate: f64) {
        self.presented += 1;
        if self.last_report.elapsed() >= Duration::from_secs(5) {
            log::info!(
                "display: {} frames presented, {}x{}, {:.1} fps",
                self.presented,
                frame.width(),
                frame.height(),
                rate
            );
            self.last_report = Instant::now();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = DaemonConfig::load()?;
    if let Some(device) = args.device.clone() {
        cfg.capture.device = device;
    }

    let mut pipeline = Pipeline::new(&cfg)?;
    pipeline.connect()?;
    pipeline.set_filter(Filter::from_name(&args.filter, args.kernel));
    if let Some((low, high)) = args.edges {
        pipeline.set_edges(Some(EdgeParams { low, high }));
    }
    if args.faces {
        pipeline.set_faces(Some(DetectParams {
            min_size: args.min_face_size,
            scale_percent: args.scale_percent,
        }));
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    log::info!(
        "visiondeskd running: device={} filter={} tick={}ms",
        cfg.capture.device,
        pipeline.filter_config().filter.name(),
        cfg.tick.as_millis()
    );

    let mut sink = LoggingSink::new();
    let mut presented = 0u64;
    let mut want_record = args.record;
    let mut last_health_log = Instant::now();

    while running.load(Ordering::SeqCst) {
        let tick_started = Instant::now();

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = pipeline.capture_stats();
            log::info!(
                "capture health={} frames={} device={}",
                pipeline.is_capture_healthy(),
                stats.frames_captured,
                stats.device
            );
            last_health_log = Instant::now();
        }

        if pipeline.tick(&mut sink)? == TickOutcome::Presented {
            presented += 1;
            // Recording needs a captured frame, so the requested session
            // starts on the first presented tick.
            if want_record {
                if let Some(path) = pipeline.start_recording()? {
                    log::info!("recording to {}", path.display());
                }
                want_record = false;
            }
            if args.ticks > 0 && presented >= args.ticks {
                break;
            }
        }

        if let Some(remaining) = cfg.tick.checked_sub(tick_started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    let recorded_secs = pipeline.recording_time();
    if let Some(path) = pipeline.stop_recording()? {
        log::info!(
            "recording finished after {}s: {}",
            recorded_secs,
            path.display()
        );
    }
    let stats = pipeline.capture_stats();
    log::info!(
        "visiondeskd stopped: {} frames captured from {}",
        stats.frames_captured,
        stats.device
    );
    Ok(())
}
