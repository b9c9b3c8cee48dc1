//! Minimal MJPEG-in-AVI container writer.
//!
//! Writes a single `vids`/`MJPG` stream: RIFF header, `hdrl` headers, `movi`
//! chunk list, `idx1` index. Length fields that depend on the frame count
//! (RIFF size, total frames, stream length, `movi` size) are written as
//! placeholders and patched on finalize.
//!
//! The writer accepts pre-encoded JPEG frames; it does not inspect them.

use anyhow::{anyhow, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Upper bound on one frame chunk (64 MiB). A JPEG bigger than this is a
/// caller bug, not a frame.
const MAX_FRAME_CHUNK: usize = 64 * 1024 * 1024;

// Fixed header layout offsets (single stream, 56-byte avih/strh, 40-byte strf).
const RIFF_SIZE_OFFSET: u64 = 4;
const TOTAL_FRAMES_OFFSET: u64 = 48;
const STREAM_LENGTH_OFFSET: u64 = 140;
const MOVI_SIZE_OFFSET: u64 = 216;

const AVIF_HASINDEX: u32 = 0x0000_0010;
const AVIIF_KEYFRAME: u32 = 0x0000_0010;

/// Streaming AVI writer. Frames are appended with [`AviWriter::write_frame`];
/// the container is valid only after [`AviWriter::finalize`] (dropping the
/// writer finalizes best-effort).
pub struct AviWriter {
    file: BufWriter<File>,
    path: PathBuf,
    frames: u32,
    /// Size of the `movi` LIST payload so far, including its fourcc.
    movi_bytes: u32,
    index: Vec<(u32, u32)>,
    finalized: bool,
}

impl AviWriter {
    /// Creates the file and writes the fixed header block.
    pub fn create(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("AVI frame size must be non-zero"));
        }
        if fps == 0 {
            return Err(anyhow!("AVI frame rate must be non-zero"));
        }
        let file = File::create(path)?;
        let mut writer = Self {
            file: BufWriter::new(file),
            path: path.to_path_buf(),
            frames: 0,
            movi_bytes: 4,
            index: Vec::new(),
            finalized: false,
        };
        writer.write_headers(width, height, fps)?;
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u32 {
        self.frames
    }

    /// Appends one JPEG-encoded frame as a `00dc` chunk.
    pub fn write_frame(&mut self, jpeg: &[u8]) -> Result<()> {
        if self.finalized {
            return Err(anyhow!("AVI writer already finalized"));
        }
        if jpeg.len() > MAX_FRAME_CHUNK {
            return Err(anyhow!(
                "frame chunk of {} bytes exceeds maximum {}",
                jpeg.len(),
                MAX_FRAME_CHUNK
            ));
        }
        let offset = self.movi_bytes;
        self.file.write_all(b"00dc")?;
        self.file.write_all(&(jpeg.len() as u32).to_le_bytes())?;
        self.file.write_all(jpeg)?;
        let pad = (jpeg.len() % 2) as u32;
        if pad == 1 {
            self.file.write_all(&[0])?;
        }
        self.movi_bytes += 8 + jpeg.len() as u32 + pad;
        self.index.push((offset, jpeg.len() as u32));
        self.frames += 1;
        Ok(())
    }

    /// Writes the index and patches the deferred length fields.
    pub fn finalize(mut self) -> Result<()> {
        self.finalize_inner()
    }

    fn finalize_inner(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;

        self.file.write_all(b"idx1")?;
        self.file
            .write_all(&((self.index.len() as u32) * 16).to_le_bytes())?;
        for (offset, size) in &self.index {
            self.file.write_all(b"00dc")?;
            self.file.write_all(&AVIIF_KEYFRAME.to_le_bytes())?;
            self.file.write_all(&offset.to_le_bytes())?;
            self.file.write_all(&size.to_le_bytes())?;
        }

        let end = self.file.stream_position()?;
        self.patch_u32(RIFF_SIZE_OFFSET, (end - 8) as u32)?;
        self.patch_u32(TOTAL_FRAMES_OFFSET, self.frames)?;
        self.patch_u32(STREAM_LENGTH_OFFSET, self.frames)?;
        self.patch_u32(MOVI_SIZE_OFFSET, self.movi_bytes)?;
        self.file.seek(SeekFrom::Start(end))?;
        self.file.flush()?;
        Ok(())
    }

    fn patch_u32(&mut self, offset: u64, value: u32) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_headers(&mut self, width: u32, height: u32, fps: u32) -> Result<()> {
        let f = &mut self.file;

        f.write_all(b"RIFF")?;
        f.write_all(&0u32.to_le_bytes())?; // riff size, patched
        f.write_all(b"AVI ")?;

        // hdrl list: avih chunk + one strl list.
        f.write_all(b"LIST")?;
        f.write_all(&192u32.to_le_bytes())?;
        f.write_all(b"hdrl")?;

        f.write_all(b"avih")?;
        f.write_all(&56u32.to_le_bytes())?;
        f.write_all(&(1_000_000 / fps).to_le_bytes())?; // microseconds per frame
        f.write_all(&0u32.to_le_bytes())?; // max bytes per second
        f.write_all(&0u32.to_le_bytes())?; // padding granularity
        f.write_all(&AVIF_HASINDEX.to_le_bytes())?;
        f.write_all(&0u32.to_le_bytes())?; // total frames, patched
        f.write_all(&0u32.to_le_bytes())?; // initial frames
        f.write_all(&1u32.to_le_bytes())?; // stream count
        f.write_all(&0u32.to_le_bytes())?; // suggested buffer size
        f.write_all(&width.to_le_bytes())?;
        f.write_all(&height.to_le_bytes())?;
        f.write_all(&[0u8; 16])?; // reserved

        f.write_all(b"LIST")?;
        f.write_all(&116u32.to_le_bytes())?;
        f.write_all(b"strl")?;

        f.write_all(b"strh")?;
        f.write_all(&56u32.to_le_bytes())?;
        f.write_all(b"vids")?;
        f.write_all(b"MJPG")?;
        f.write_all(&0u32.to_le_bytes())?; // flags
        f.write_all(&0u16.to_le_bytes())?; // priority
        f.write_all(&0u16.to_le_bytes())?; // language
        f.write_all(&0u32.to_le_bytes())?; // initial frames
        f.write_all(&1u32.to_le_bytes())?; // scale
        f.write_all(&fps.to_le_bytes())?; // rate
        f.write_all(&0u32.to_le_bytes())?; // start
        f.write_all(&0u32.to_le_bytes())?; // stream length, patched
        f.write_all(&0u32.to_le_bytes())?; // suggested buffer size
        f.write_all(&u32::MAX.to_le_bytes())?; // quality: driver default
        f.write_all(&0u32.to_le_bytes())?; // sample size
        f.write_all(&0u16.to_le_bytes())?; // frame rect: left
        f.write_all(&0u16.to_le_bytes())?; // top
        f.write_all(&(width as u16).to_le_bytes())?; // right
        f.write_all(&(height as u16).to_le_bytes())?; // bottom

        f.write_all(b"strf")?;
        f.write_all(&40u32.to_le_bytes())?;
        f.write_all(&40u32.to_le_bytes())?; // BITMAPINFOHEADER size
        f.write_all(&(width as i32).to_le_bytes())?;
        f.write_all(&(height as i32).to_le_bytes())?;
        f.write_all(&1u16.to_le_bytes())?; // planes
        f.write_all(&24u16.to_le_bytes())?; // bits per pixel
        f.write_all(b"MJPG")?; // compression fourcc
        f.write_all(&(width * height * 3).to_le_bytes())?; // image size
        f.write_all(&0i32.to_le_bytes())?; // x pixels per meter
        f.write_all(&0i32.to_le_bytes())?; // y pixels per meter
        f.write_all(&0u32.to_le_bytes())?; // colors used
        f.write_all(&0u32.to_le_bytes())?; // colors important

        // movi list: size patched, chunks follow.
        f.write_all(b"LIST")?;
        f.write_all(&0u32.to_le_bytes())?;
        f.write_all(b"movi")?;
        Ok(())
    }
}

impl Drop for AviWriter {
    fn drop(&mut self) {
        if !self.finalized {
            if let Err(err) = self.finalize_inner() {
                log::warn!("failed to finalize {}: {}", self.path.display(), err);
            }
        }
    }
}
