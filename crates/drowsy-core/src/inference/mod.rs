//! Model inference with Candle.
//!
//! Provides the production face detector, `BlazeFace`, and the weight
//! loaders it is built from.

mod blazeface;
mod device;
mod loader;

pub use blazeface::{BlazeFace, BlazeFaceConfig};
pub use device::select_device;
pub use loader::load_model;
