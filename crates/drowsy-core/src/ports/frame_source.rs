//! Frame source port for cameras, video files and frame replays.

use crate::domain::Frame;

/// Port for reading frames one at a time.
pub trait FrameSource {
    /// Blocks until the next frame is available.
    ///
    /// Returns `Ok(None)` at end of stream or when the device stops
    /// delivering frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails in a way that is not a normal
    /// end of stream.
    fn read(&mut self) -> anyhow::Result<Option<Frame>>;

    /// Returns the total number of frames, if known.
    fn len_hint(&self) -> Option<u64> {
        None
    }

    /// Releases the underlying device. Called exactly once when monitoring ends.
    fn release(&mut self) {}
}
