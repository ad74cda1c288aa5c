//! Displays that need no window system.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use drowsy_core::{FrameDisplay, KeyAction};
use image::RgbImage;
use tracing::debug;

/// Display that shows nothing and never asks to quit.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessDisplay;

impl FrameDisplay for HeadlessDisplay {
    fn show(&mut self, _index: u64, _frame: &RgbImage) -> Result<KeyAction> {
        Ok(KeyAction::Continue)
    }
}

/// Saves every annotated frame as a PNG, then hands it to an inner display.
pub struct FrameDirWriter<D> {
    dir: PathBuf,
    inner: D,
    written: u64,
}

impl<D: FrameDisplay> FrameDirWriter<D> {
    /// Writes frames into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>, inner: D) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create frame directory {}", dir.display()))?;

        Ok(Self {
            dir,
            inner,
            written: 0,
        })
    }

    /// Number of frames written so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Path a frame index is saved under.
    #[must_use]
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl<D: FrameDisplay> FrameDisplay for FrameDirWriter<D> {
    fn show(&mut self, index: u64, frame: &RgbImage) -> Result<KeyAction> {
        let path = self.frame_path(index);
        frame
            .save(&path)
            .with_context(|| format!("Failed to save frame {}", path.display()))?;
        self.written += 1;
        debug!("Saved {}", path.display());

        self.inner.show(index, frame)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_headless_never_quits() {
        let mut display = HeadlessDisplay;
        let frame = RgbImage::new(2, 2);
        assert_eq!(display.show(1, &frame).unwrap(), KeyAction::Continue);
    }

    #[test]
    fn test_writer_saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("annotated");
        let mut writer = FrameDirWriter::new(&out, HeadlessDisplay).unwrap();

        let frame = RgbImage::from_pixel(4, 3, Rgb([0, 0, 255]));
        writer.show(7, &frame).unwrap();

        let path = out.join("frame_000007.png");
        assert!(path.exists());
        assert_eq!(writer.written(), 1);

        let saved = image::open(&path).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (4, 3));
        assert_eq!(saved.get_pixel(1, 1).0, [0, 0, 255]);
    }
}
