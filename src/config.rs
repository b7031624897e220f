//! Link configuration file.
//!
//! Every section is optional; missing keys fall back to their defaults.
//!
//! ```toml
//! [capture]
//! width = 160
//! height = 120
//! fps = 30
//!
//! [protocol]
//! start_sequence = [1, 1, 1, 1, 1, 1, 1, 0]
//! end_sequence = [0, 1, 1, 1, 1, 1, 1, 1, 1, 0]
//! parity = "even"
//!
//! [sampling]
//! mode = "lines"
//! bits_per_tick = 4
//! base_capture_interval = 0.5
//!
//! [calibration]
//! settle_seconds = 2.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::RateConfig;
use crate::capture::{CaptureConfig, ConfigError};
use crate::classify::ChannelMap;
use crate::locate::CalibrationConfig;
use crate::protocol::ProtocolConfig;
use crate::sampling::{SamplingConfig, SamplingMode};
use crate::sender::SenderTiming;

/// Complete configuration of a link endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub capture: CaptureConfig,
    pub protocol: ProtocolConfig,
    pub sampling: SamplingConfig,
    pub calibration: CalibrationConfig,
    pub rate: RateConfig,
    /// Timing of the simulated sender.
    pub sender: SenderTiming,
    pub channel: ChannelMap,
}

impl LinkConfig {
    /// Loads and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.protocol.validate()?;
        self.sampling.validate()?;
        self.calibration.validate()?;
        self.rate.validate()?;
        self.sender.validate()?;

        if !(0.0..1.0).contains(&self.channel.majority) {
            return Err(ConfigError::InvalidThreshold {
                name: "majority",
                value: self.channel.majority,
            });
        }
        if !(0.0..=255.0).contains(&self.channel.luminance_threshold) {
            return Err(ConfigError::InvalidThreshold {
                name: "luminance",
                value: f64::from(self.channel.luminance_threshold),
            });
        }
        if self.sampling.mode == SamplingMode::Lines {
            for (role, spec) in [("zero", &self.channel.zero), ("one", &self.channel.one)] {
                if spec.is_chromatic() {
                    return Err(ConfigError::ChromaticLineBits {
                        role,
                        color: spec.name().to_string(),
                    });
                }
            }
        }
        if self.sender.marker_hold <= self.calibration.settle_seconds {
            tracing::warn!(
                marker_hold = self.sender.marker_hold,
                settle = self.calibration.settle_seconds,
                "Simulated marker hold does not outlast the settle time"
            );
        }
        Ok(())
    }
}
