//! Video frames.

use image::DynamicImage;

/// One image sample from a frame source.
#[derive(Debug, Clone)]
pub struct Frame {
    /// One-based position in the stream.
    pub index: u64,
    /// Where the frame came from (device, file or synthetic label).
    pub source: String,
    /// Decoded image data.
    pub image: DynamicImage,
}

impl Frame {
    /// Creates a frame.
    #[must_use]
    pub fn new(index: u64, source: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            index,
            source: source.into(),
            image,
        }
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
