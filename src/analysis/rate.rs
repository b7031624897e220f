//! Capture interval adaptation driven by bit error rate.

use serde::{Deserialize, Serialize};

use crate::capture::ConfigError;

/// Rate controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Interval change per adjustment, in seconds.
    pub step: f64,
    /// Shortest interval the controller will set.
    pub min_interval: f64,
    /// Longest interval the controller will set; `None` leaves it open.
    pub max_interval: Option<f64>,
    /// Above this rate the receiver samples faster.
    pub high_ber: f64,
    /// Below this rate the receiver samples slower.
    pub low_ber: f64,
    /// Compared bits kept in the trailing window.
    pub window_bits: usize,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            step: 0.1,
            min_interval: 0.1,
            max_interval: Some(5.0),
            high_ber: 0.10,
            low_ber: 0.01,
            window_bits: 256,
        }
    }
}

impl RateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("rate step", self.step), ("minimum", self.min_interval)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidInterval { name, value });
            }
        }
        if let Some(max) = self.max_interval {
            if !max.is_finite() || max < self.min_interval {
                return Err(ConfigError::InvalidInterval {
                    name: "maximum",
                    value: max,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.low_ber) || self.low_ber > self.high_ber {
            return Err(ConfigError::InvalidThreshold {
                name: "low BER",
                value: self.low_ber,
            });
        }
        if !(0.0..=1.0).contains(&self.high_ber) {
            return Err(ConfigError::InvalidThreshold {
                name: "high BER",
                value: self.high_ber,
            });
        }
        Ok(())
    }
}

/// Direction of an interval change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateAdjustment {
    /// Shorter interval.
    Faster,
    /// Longer interval.
    Slower,
    Hold,
}

/// Steps the capture interval toward an error rate inside the
/// configured band.
#[derive(Debug, Clone, Default)]
pub struct RateController {
    config: RateConfig,
}

impl RateController {
    pub fn new(config: RateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RateConfig {
        &self.config
    }

    /// Which way a given error rate pushes the interval.
    pub fn decide(&self, ber: f64) -> RateAdjustment {
        if ber > self.config.high_ber {
            RateAdjustment::Faster
        } else if ber < self.config.low_ber {
            RateAdjustment::Slower
        } else {
            RateAdjustment::Hold
        }
    }

    /// Returns the interval to use after observing `ber` at `interval`.
    pub fn update(&self, interval: f64, ber: f64) -> f64 {
        let adjustment = self.decide(ber);
        let next = match adjustment {
            RateAdjustment::Faster => self.faster(interval),
            RateAdjustment::Slower => self.slower(interval),
            RateAdjustment::Hold => interval,
        };
        if adjustment != RateAdjustment::Hold {
            tracing::info!(ber, from_s = interval, to_s = next, ?adjustment, "Capture interval adjusted");
        }
        next
    }

    /// One step shorter, not below the minimum.
    pub fn faster(&self, interval: f64) -> f64 {
        (interval - self.config.step).max(self.config.min_interval)
    }

    /// One step longer, not above the maximum if one is set.
    pub fn slower(&self, interval: f64) -> f64 {
        let next = interval + self.config.step;
        match self.config.max_interval {
            Some(max) => next.min(max),
            None => next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_high_ber_samples_faster() {
        let controller = RateController::default();
        assert!(close(controller.update(0.5, 0.2), 0.4));
    }

    #[test]
    fn test_floor_holds() {
        let controller = RateController::default();
        assert!(close(controller.update(0.1, 0.2), 0.1));
        assert!(close(controller.faster(0.15), 0.1));
    }

    #[test]
    fn test_low_ber_samples_slower() {
        let controller = RateController::default();
        assert!(close(controller.update(0.5, 0.005), 0.6));
    }

    #[test]
    fn test_band_holds_interval() {
        let controller = RateController::default();
        assert_eq!(controller.decide(0.05), RateAdjustment::Hold);
        assert_eq!(controller.update(0.5, 0.05), 0.5);
        // Both bounds are exclusive
        assert_eq!(controller.decide(0.10), RateAdjustment::Hold);
        assert_eq!(controller.decide(0.01), RateAdjustment::Hold);
    }

    #[test]
    fn test_ceiling() {
        let controller = RateController::default();
        assert!(close(controller.slower(4.95), 5.0));

        let open = RateController::new(RateConfig {
            max_interval: None,
            ..Default::default()
        });
        assert!(close(open.slower(4.95), 5.05));
    }

    #[test]
    fn test_config_validation() {
        assert!(RateConfig::default().validate().is_ok());
        let config = RateConfig {
            low_ber: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = RateConfig {
            max_interval: Some(0.05),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval { name: "maximum", .. })
        ));
    }
}
