//! Output persistence: directories, timestamped filenames, snapshots.
//!
//! Recordings and snapshots share the same naming scheme,
//! `<prefix>_<YYYYMMDD_HHMMSS>.<ext>`. Two requests inside the same
//! timestamp second would collide, so `unique_path` disambiguates with a
//! numeric suffix instead of overwriting.

use anyhow::{Context, Result};
use chrono::Local;
use image::RgbImage;
use std::path::{Path, PathBuf};

pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create output directory {}", dir.display()))
}

/// Wall-clock timestamp in filename form.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Returns `<dir>/<stem>.<ext>`, appending `_1`, `_2`, ... before the
/// extension until the path does not exist yet.
pub fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{stem}.{ext}"));
    if !candidate.exists() {
        return candidate;
    }
    for n in 1.. {
        let candidate = dir.join(format!("{stem}_{n}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

/// Persists one frame as `<prefix>_snap_<timestamp>.jpg` and returns the path.
pub fn write_snapshot(dir: &Path, prefix: &str, frame: &RgbImage) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let stem = format!("{}_snap_{}", prefix, timestamp());
    let path = unique_path(dir, &stem, "jpg");
    frame
        .save(&path)
        .with_context(|| format!("write snapshot {}", path.display()))?;
    Ok(path)
}
