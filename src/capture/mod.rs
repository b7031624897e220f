//! Camera input and frame handling.
//!
//! This module provides abstractions for capturing frames from a camera
//! and managing camera configuration. The receiver never opens devices
//! itself; it consumes whatever [`Camera`] it is handed.

mod camera;
mod config;
mod frame;

pub(crate) use camera::elapsed;
pub use camera::{Camera, CameraError, ScriptedCamera};
pub use config::{CaptureConfig, ConfigError};
pub use frame::{Frame, CHANNELS};
