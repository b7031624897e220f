//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing the receiver to run against real devices or against a
//! scripted screen rendering for simulation and tests.

use std::time::{Duration, Instant};

use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use thiserror::Error;

use super::{frame::CHANNELS, CaptureConfig, Frame};
use crate::locate::Roi;
use crate::sender::{DisplayPattern, SenderSchedule};

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("camera not initialized")]
    NotInitialized,
    #[error("end of stream")]
    EndOfStream,
}

/// Trait for camera implementations.
///
/// `capture` may block until the next frame is available. A source that
/// has no more frames returns [`CameraError::EndOfStream`].
pub trait Camera {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures a single frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

/// Dark surround around the simulated monitor.
const BACKGROUND: [u8; 3] = [24, 24, 24];

/// Synthetic camera that films a monitor playing a [`SenderSchedule`].
///
/// Frames are stamped on a virtual clock advancing by one frame period
/// per capture, so timing-dependent logic runs deterministically and
/// without sleeping. The stream ends once the schedule is exhausted.
#[derive(Debug)]
pub struct ScriptedCamera {
    schedule: SenderSchedule,
    screen: Roi,
    noise: u8,
    rng: ChaCha8Rng,
    config: Option<CaptureConfig>,
    epoch: Instant,
    sequence: u64,
}

impl ScriptedCamera {
    /// Creates a camera showing `schedule` inside the `screen` rectangle.
    pub fn new(schedule: SenderSchedule, screen: Roi) -> Self {
        Self {
            schedule,
            screen,
            noise: 0,
            rng: ChaCha8Rng::seed_from_u64(0),
            config: None,
            epoch: Instant::now(),
            sequence: 0,
        }
    }

    /// Adds uniform per-channel noise of up to `amplitude` levels.
    pub fn with_noise(mut self, amplitude: u8, seed: u64) -> Self {
        self.noise = amplitude;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Returns the screen rectangle in frame coordinates.
    pub fn screen(&self) -> Roi {
        self.screen
    }

    /// Centers a screen of the given relative size inside the frame.
    pub fn centered_screen(config: &CaptureConfig, fraction: f64) -> Roi {
        let fraction = fraction.clamp(0.05, 1.0);
        let width = ((f64::from(config.width) * fraction) as u32).max(1);
        let height = ((f64::from(config.height) * fraction) as u32).max(1);
        Roi::new(
            (config.width - width) / 2,
            (config.height - height) / 2,
            width,
            height,
        )
    }

    fn render(&mut self, config: &CaptureConfig, pattern: &DisplayPattern) -> Vec<u8> {
        let (width, height) = (config.width, config.height);
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize) * CHANNELS);
        let bands = pattern.bands();
        for y in 0..height {
            for x in 0..width {
                let band = (y.saturating_sub(self.screen.y) as usize * bands.len())
                    / self.screen.height.max(1) as usize;
                // A pattern with no bands shows nothing on the screen
                let color = match bands.get(band.min(bands.len().saturating_sub(1))) {
                    Some(&color) if self.screen.contains(x, y) => color,
                    _ => BACKGROUND,
                };
                for channel in color {
                    pixels.push(self.perturb(channel));
                }
            }
        }
        pixels
    }

    fn perturb(&mut self, value: u8) -> u8 {
        if self.noise == 0 {
            return value;
        }
        let span = u32::from(self.noise) * 2 + 1;
        let offset = (self.rng.next_u32() % span) as i16 - i16::from(self.noise);
        (i16::from(value) + offset).clamp(0, 255) as u8
    }
}

impl Camera for ScriptedCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        if self.screen.x + self.screen.width > config.width
            || self.screen.y + self.screen.height > config.height
            || self.screen.is_empty()
        {
            return Err(CameraError::ConfigFailed(format!(
                "screen {:?} does not fit a {}x{} frame",
                self.screen, config.width, config.height
            )));
        }
        self.config = Some(config.clone());
        self.sequence = 0;
        self.epoch = Instant::now();
        tracing::info!(
            steps = self.schedule.steps().len(),
            duration_s = self.schedule.total_duration().as_secs_f64(),
            "ScriptedCamera opened"
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.clone().ok_or(CameraError::NotInitialized)?;

        let offset = config.frame_period() * self.sequence as u32;
        let pattern = self
            .schedule
            .pattern_at(offset)
            .cloned()
            .ok_or(CameraError::EndOfStream)?;

        let pixels = self.render(&config, &pattern);
        self.sequence += 1;
        Ok(Frame::with_timestamp(
            pixels,
            config.width,
            config.height,
            self.sequence,
            self.epoch + offset,
        ))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        tracing::info!("ScriptedCamera closed");
    }
}

/// Convenience for frame timestamps relative to a stream start.
pub(crate) fn elapsed(since: Instant, now: Instant) -> Duration {
    now.saturating_duration_since(since)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::DisplayStep;

    fn schedule() -> SenderSchedule {
        SenderSchedule::from_steps(vec![
            DisplayStep::solid([255, 0, 0], Duration::from_millis(100)),
            DisplayStep::solid([0, 255, 0], Duration::from_millis(100)),
        ])
    }

    fn config() -> CaptureConfig {
        CaptureConfig {
            width: 32,
            height: 24,
            fps: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_scripted_camera_lifecycle() {
        let mut camera = ScriptedCamera::new(schedule(), Roi::new(8, 6, 16, 12));

        assert!(!camera.is_open());
        camera.open(&config()).unwrap();
        assert!(camera.is_open());

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.pixel(10, 10), Some([255, 0, 0]));
        assert_eq!(frame.pixel(0, 0), Some(BACKGROUND));

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = ScriptedCamera::new(schedule(), Roi::new(8, 6, 16, 12));
        assert!(matches!(camera.capture(), Err(CameraError::NotInitialized)));
    }

    #[test]
    fn test_stream_ends_after_schedule() {
        let mut camera = ScriptedCamera::new(schedule(), Roi::new(8, 6, 16, 12));
        camera.open(&config()).unwrap();

        // 200ms of schedule at 20fps = 4 frames
        let mut frames = Vec::new();
        loop {
            match camera.capture() {
                Ok(frame) => frames.push(frame),
                Err(CameraError::EndOfStream) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[2].pixel(10, 10), Some([0, 255, 0]));
        assert_eq!(
            elapsed(frames[0].timestamp(), frames[3].timestamp()),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn test_empty_band_pattern_renders_background() {
        let schedule = SenderSchedule::from_steps(vec![DisplayStep::bands(
            Vec::new(),
            Duration::from_millis(100),
        )]);
        let mut camera = ScriptedCamera::new(schedule, Roi::new(8, 6, 16, 12));
        camera.open(&config()).unwrap();

        let frame = camera.capture().unwrap();
        assert_eq!(frame.pixel(10, 10), Some(BACKGROUND));
        assert_eq!(frame.pixel(0, 0), Some(BACKGROUND));
    }

    #[test]
    fn test_screen_must_fit_frame() {
        let mut camera = ScriptedCamera::new(schedule(), Roi::new(20, 6, 16, 12));
        assert!(matches!(
            camera.open(&config()),
            Err(CameraError::ConfigFailed(_))
        ));
    }

    #[test]
    fn test_noise_stays_in_range() {
        let mut camera =
            ScriptedCamera::new(schedule(), Roi::new(8, 6, 16, 12)).with_noise(10, 7);
        camera.open(&config()).unwrap();
        let frame = camera.capture().unwrap();
        let [r, g, b] = frame.pixel(10, 10).unwrap();
        assert!(r >= 245);
        assert!(g <= 10 && b <= 10);
    }
}
