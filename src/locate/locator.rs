//! ROI calibration against a fixed marker color.
//!
//! The locator waits until the marker has been seen continuously for the
//! settle duration before trusting its position. Losing the marker at any
//! point before that restarts the wait.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{detect::detect_marker, Roi};
use crate::capture::{elapsed, Camera, CameraError, ConfigError, Frame};
use crate::classify::SymbolClassifier;
use crate::receiver::{CancellationToken, LinkError};

/// Calibration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Continuous detection required before locking, in seconds.
    pub settle_seconds: f64,
    /// Smallest blob accepted as the marker, in pixels.
    pub min_marker_area: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            settle_seconds: 2.0,
            min_marker_area: 16,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.settle_seconds.is_finite() || self.settle_seconds < 0.0 {
            return Err(ConfigError::InvalidInterval {
                name: "settle",
                value: self.settle_seconds,
            });
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs_f64(self.settle_seconds.max(0.0))
    }
}

/// Locator progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorState {
    /// No marker in view.
    Searching,
    /// Marker visible since `since`, last seen at `bounds`.
    Candidate { since: Instant, bounds: Roi },
    /// Settled; the region is fixed for the session.
    Locked(Roi),
}

/// Finds and locks the screen region using the calibration marker.
#[derive(Debug, Clone)]
pub struct RoiLocator {
    classifier: SymbolClassifier,
    config: CalibrationConfig,
    state: LocatorState,
}

impl RoiLocator {
    pub fn new(classifier: SymbolClassifier, config: CalibrationConfig) -> Self {
        Self {
            classifier,
            config,
            state: LocatorState::Searching,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> LocatorState {
        self.state
    }

    /// Returns the locked region, if any.
    pub fn locked(&self) -> Option<Roi> {
        match self.state {
            LocatorState::Locked(roi) => Some(roi),
            _ => None,
        }
    }

    /// Forgets any candidate or lock.
    pub fn reset(&mut self) {
        self.state = LocatorState::Searching;
        tracing::info!("ROI locator reset");
    }

    /// Feeds one frame through the state machine.
    pub fn observe(&mut self, frame: &Frame) -> LocatorState {
        if let LocatorState::Locked(_) = self.state {
            return self.state;
        }

        let marker = &self.classifier.map().marker;
        let detected = detect_marker(frame, &self.classifier, marker, self.config.min_marker_area);
        let now = frame.timestamp();

        self.state = match (self.state, detected) {
            (_, None) => {
                if let LocatorState::Candidate { .. } = self.state {
                    tracing::debug!(frame = frame.sequence(), "Marker lost before settling");
                }
                LocatorState::Searching
            }
            (LocatorState::Searching, Some(blob)) => {
                tracing::info!(
                    bounds = %blob.bounds,
                    settle_s = self.config.settle_seconds,
                    "Marker detected, waiting to settle"
                );
                self.settle_or(now, blob.bounds)
            }
            (LocatorState::Candidate { since, .. }, Some(blob)) => {
                if elapsed(since, now) >= self.config.settle() {
                    tracing::info!(roi = %blob.bounds, "ROI locked");
                    LocatorState::Locked(blob.bounds)
                } else {
                    LocatorState::Candidate {
                        since,
                        bounds: blob.bounds,
                    }
                }
            }
            (LocatorState::Locked(roi), _) => LocatorState::Locked(roi),
        };

        self.state
    }

    // A zero settle time locks on first sight.
    fn settle_or(&self, now: Instant, bounds: Roi) -> LocatorState {
        if self.config.settle().is_zero() {
            tracing::info!(roi = %bounds, "ROI locked");
            LocatorState::Locked(bounds)
        } else {
            LocatorState::Candidate { since: now, bounds }
        }
    }

    /// Pulls frames from `camera` until the region locks.
    ///
    /// Fails with [`LinkError::NoMarkerDetected`] if the stream ends first
    /// and with [`LinkError::Cancelled`] if `cancel` fires.
    pub fn locate<C: Camera + ?Sized>(
        &mut self,
        camera: &mut C,
        cancel: &CancellationToken,
    ) -> Result<Roi, LinkError> {
        loop {
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled);
            }
            let frame = match camera.capture() {
                Ok(frame) => frame,
                Err(CameraError::EndOfStream) => return Err(LinkError::NoMarkerDetected),
                Err(e) => return Err(e.into()),
            };
            if let LocatorState::Locked(roi) = self.observe(&frame) {
                return Ok(roi);
            }
        }
    }
}
