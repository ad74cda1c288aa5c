//! Display port for annotated frames and the quit key.

use image::RgbImage;

/// What the user asked for while a frame was on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Keep monitoring.
    Continue,
    /// Stop monitoring.
    Quit,
}

/// Port for showing frames and polling the keyboard.
pub trait FrameDisplay {
    /// Shows an annotated frame and polls for a key press.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be shown.
    fn show(&mut self, index: u64, frame: &RgbImage) -> anyhow::Result<KeyAction>;
}

impl<T: FrameDisplay + ?Sized> FrameDisplay for Box<T> {
    fn show(&mut self, index: u64, frame: &RgbImage) -> anyhow::Result<KeyAction> {
        (**self).show(index, frame)
    }
}
