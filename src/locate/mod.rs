//! Screen region calibration and tracking.
//!
//! The receiver samples a fixed rectangle of the camera image. That
//! rectangle is found by looking for the sender's calibration marker and
//! holding off until it has been stable for the settle time.

mod detect;
mod locator;
mod roi;

pub use detect::{detect_marker, Blob};
pub use locator::{CalibrationConfig, LocatorState, RoiLocator};
pub use roi::Roi;
