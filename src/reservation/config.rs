use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The parameters of an intersection manager's reservation grid.
///
/// Missing fields take their default values when loaded from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationConfig {
    /// The length of a simulation tick, in s.
    pub simulation_time_step: f64,
    /// The length of a reservation grid time step, in s.
    pub grid_time_step: f64,
    /// The number of tiles per m, both around and across the ring.
    pub granularity: f64,
    /// The margin added in front of and behind every vehicle, in m.
    pub static_buffer_size: f64,
    /// The time a tile is held before and after it is occupied, in s.
    pub internal_tile_time_buffer_size: f64,
    /// Whether tiles on the outer edge of the grid use their own time buffer.
    pub edge_tile_time_buffer_enabled: bool,
    /// The time an outer edge tile is held before and after it is occupied, in s.
    pub edge_tile_time_buffer_size: f64,
    /// How far ahead of the current time a vehicle may ask to arrive, in s.
    pub max_future_reservation_time: f64,
    /// The longest a single reservation may hold the intersection, in s.
    pub max_reservation_duration: f64,
}

/// An invalid reservation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be greater than zero, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            simulation_time_step: 0.05,
            grid_time_step: 0.1,
            granularity: 1.0,
            static_buffer_size: 0.25,
            internal_tile_time_buffer_size: 0.1,
            edge_tile_time_buffer_enabled: true,
            edge_tile_time_buffer_size: 0.25,
            max_future_reservation_time: 10.0,
            max_reservation_duration: 30.0,
        }
    }
}

impl ReservationConfig {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every parameter is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("simulation_time_step", self.simulation_time_step),
            ("grid_time_step", self.grid_time_step),
            ("granularity", self.granularity),
            ("max_reservation_duration", self.max_reservation_duration),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        let non_negative = [
            ("static_buffer_size", self.static_buffer_size),
            ("internal_tile_time_buffer_size", self.internal_tile_time_buffer_size),
            ("edge_tile_time_buffer_size", self.edge_tile_time_buffer_size),
            ("max_future_reservation_time", self.max_future_reservation_time),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { name, value });
            }
        }
        Ok(())
    }

    /// The time buffer applied to a tile, in s.
    pub(crate) fn tile_time_buffer(&self, edge: bool) -> f64 {
        if edge && self.edge_tile_time_buffer_enabled {
            self.edge_tile_time_buffer_size
        } else {
            self.internal_tile_time_buffer_size
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ReservationConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = ReservationConfig::from_json(r#"{ "granularity": 2.0 }"#).unwrap();
        assert_eq!(config.granularity, 2.0);
        assert_eq!(config.grid_time_step, ReservationConfig::default().grid_time_step);
    }

    #[test]
    fn rejects_bad_values() {
        let err = ReservationConfig::from_json(r#"{ "grid_time_step": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { name: "grid_time_step", .. }));
        let err = ReservationConfig::from_json(r#"{ "static_buffer_size": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Negative { .. }));
        let err = ReservationConfig::from_json(r#"{ "max_reservation_duration": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { name: "max_reservation_duration", .. }));
        let err = ReservationConfig::from_json("{ granularity: ").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn edge_buffer_only_when_enabled() {
        let mut config = ReservationConfig::default();
        assert_eq!(config.tile_time_buffer(true), 0.25);
        assert_eq!(config.tile_time_buffer(false), 0.1);
        config.edge_tile_time_buffer_enabled = false;
        assert_eq!(config.tile_time_buffer(true), 0.1);
    }
}
