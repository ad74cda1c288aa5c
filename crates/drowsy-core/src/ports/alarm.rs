//! Alarm sound port.

use std::path::Path;

/// Port for a looping alert sound.
///
/// Both calls return promptly; playback continues in the background until
/// `stop` is called.
pub trait Alarm {
    /// Starts looping the sound at `sound`.
    ///
    /// # Errors
    ///
    /// Returns an error if playback cannot be started.
    fn start_loop(&mut self, sound: &Path) -> anyhow::Result<()>;

    /// Stops any playing sound.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the request.
    fn stop(&mut self) -> anyhow::Result<()>;
}
