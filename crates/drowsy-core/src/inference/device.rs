//! Compute device selection.

use candle_core::Device;
use tracing::{debug, info};

/// Picks the device models run on.
///
/// With `allow_gpu` set, tries Metal then CUDA when the matching crate
/// feature is compiled in; otherwise, or if neither is usable, runs on CPU.
#[must_use]
pub fn select_device(allow_gpu: bool) -> Device {
    if allow_gpu {
        #[cfg(feature = "metal")]
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Inference device: Metal");
                return device;
            }
            Err(e) => debug!("Metal unavailable: {e}"),
        }

        #[cfg(feature = "cuda")]
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Inference device: CUDA");
                return device;
            }
            Err(e) => debug!("CUDA unavailable: {e}"),
        }
    } else {
        debug!("GPU disabled by configuration");
    }

    info!("Inference device: CPU");
    Device::Cpu
}
