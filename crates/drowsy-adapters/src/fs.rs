//! Filesystem adapter replaying a directory of image frames.

use anyhow::{bail, Context, Result};
use drowsy_core::{Frame, FrameSource};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Supported frame extensions.
const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Frame source that replays image files in file-name order.
pub struct FsFrameSource {
    files: Vec<PathBuf>,
    next: usize,
}

impl FsFrameSource {
    /// Opens a directory of frames.
    ///
    /// Files are sorted by name; anything without a supported image
    /// extension is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is not a readable directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            bail!("Frame directory does not exist: {}", dir.display());
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                let keep = path.is_file() && is_supported_frame(path);
                if !keep && path.is_file() {
                    debug!("Skipping non-image file: {}", path.display());
                }
                keep
            })
            .collect();
        files.sort();

        if files.is_empty() {
            warn!("No frames found in {}", dir.display());
        } else {
            debug!("Found {} frames in {}", files.len(), dir.display());
        }

        Ok(Self::from_files(files))
    }

    /// Replays an explicit list of frame files in the given order.
    #[must_use]
    pub const fn from_files(files: Vec<PathBuf>) -> Self {
        Self { files, next: 0 }
    }
}

impl FrameSource for FsFrameSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let image = image::open(path)
            .with_context(|| format!("Failed to open frame: {}", path.display()))?;

        Ok(Some(Frame::new(
            self.next as u64,
            path.to_string_lossy(),
            image,
        )))
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.files.len() as u64)
    }

    fn release(&mut self) {
        debug!("Closing frame replay after {} of {} frames", self.next, self.files.len());
        self.next = self.files.len();
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_frame() {
        assert!(is_supported_frame(Path::new("0001.jpg")));
        assert!(is_supported_frame(Path::new("0001.JPEG")));
        assert!(is_supported_frame(Path::new("frame.png")));
        assert!(is_supported_frame(Path::new("frame.bmp")));
        assert!(!is_supported_frame(Path::new("notes.txt")));
        assert!(!is_supported_frame(Path::new("frame")));
    }

    #[test]
    fn test_open_missing_dir() {
        assert!(FsFrameSource::open("/nonexistent/frames").is_err());
    }

    #[test]
    fn test_release_ends_replay() {
        let mut source = FsFrameSource::from_files(vec![PathBuf::from("a.png")]);
        source.release();
        assert!(matches!(source.read(), Ok(None)));
    }
}
