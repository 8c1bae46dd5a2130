//! World and time-stepping parameters shared by every worker.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("t_max must be non-negative, got {0}")]
    NegativeDuration(f64),

    #[error("at least one worker is required")]
    NoWorkers,

    #[error("rank {rank} is outside a run of {workers} workers")]
    RankOutOfRange { rank: u32, workers: usize },

    #[error("strip width {width} is narrower than two transfer margins of {margin}")]
    StripTooNarrow { width: f64, margin: f64 },
}

/// World geometry and integration parameters.
///
/// Every worker of a run must use the same values; strip bounds, buffer
/// lines and the step schedule are all derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Full world width along x (partitioned into strips)
    pub world_width: f64,

    /// World height along y (not partitioned)
    pub height: f64,

    /// Radius shared by every body
    pub radius: f64,

    /// Transfer band depth, in body diameters
    pub buffer_diameters: f64,

    /// Time step
    pub dt: f64,

    /// Simulated time at which the run stops
    pub t_max: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_width: 100.0,
            height: 50.0,
            radius: 1.0,
            buffer_diameters: 1.0,
            dt: 0.1,
            t_max: 200.0,
        }
    }
}

impl WorldConfig {
    /// Distance of the buffer line from a shared strip edge.
    pub fn margin(&self) -> f64 {
        self.buffer_diameters * 2.0 * self.radius
    }

    /// Nominal strip width for `workers` workers.
    pub fn strip_width(&self, workers: usize) -> f64 {
        self.world_width / workers as f64
    }

    /// Checks the parameters for a run with `workers` workers.
    pub fn validate(&self, workers: usize) -> Result<(), ConfigError> {
        for (name, value) in [
            ("world_width", self.world_width),
            ("height", self.height),
            ("radius", self.radius),
            ("buffer_diameters", self.buffer_diameters),
            ("dt", self.dt),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        if self.t_max.is_nan() || self.t_max < 0.0 {
            return Err(ConfigError::NegativeDuration(self.t_max));
        }

        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        // A single strip has no shared edge and therefore no transfer band
        let width = self.strip_width(workers);
        if workers > 1 && width < 2.0 * self.margin() {
            return Err(ConfigError::StripTooNarrow {
                width,
                margin: self.margin(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.world_width, 100.0);
        assert_eq!(config.height, 50.0);
        assert_eq!(config.margin(), 2.0);
        assert!(config.validate(2).is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = WorldConfig {
            dt: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(2),
            Err(ConfigError::NotPositive { name: "dt", value: 0.0 })
        );

        let config = WorldConfig {
            t_max: -1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(2), Err(ConfigError::NegativeDuration(-1.0)));

        assert_eq!(WorldConfig::default().validate(0), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn test_rejects_narrow_strips() {
        // 100 / 30 = 3.33 < 2 * 2.0
        let err = WorldConfig::default().validate(30).unwrap_err();
        assert!(matches!(err, ConfigError::StripTooNarrow { .. }));

        // 100 / 25 = 4.0 is exactly wide enough
        assert!(WorldConfig::default().validate(25).is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: WorldConfig = serde_json::from_str(r#"{ "t_max": 5.0 }"#).unwrap();
        assert_eq!(config.t_max, 5.0);
        assert_eq!(config.world_width, 100.0);
    }
}
