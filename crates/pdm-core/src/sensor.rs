//! Sensor channels and the derived geometry used by the damage formulas.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw sensor channels carried by every device.
///
/// The damage formulas treat the three channels as spatial-like
/// coordinates `x`, `y`, `z` in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensor {
    Temperature,
    Pressure,
    Load,
}

impl Sensor {
    /// Number of channels per device.
    pub const COUNT: usize = 3;

    /// All channels in emission order.
    pub fn all() -> &'static [Sensor] {
        &[Sensor::Temperature, Sensor::Pressure, Sensor::Load]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sensor::Temperature => "temperature",
            Sensor::Pressure => "pressure",
            Sensor::Load => "load",
        }
    }

    /// Column index of this channel.
    pub fn index(&self) -> usize {
        match self {
            Sensor::Temperature => 0,
            Sensor::Pressure => 1,
            Sensor::Load => 2,
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "temperature" => Ok(Sensor::Temperature),
            "pressure" => Ok(Sensor::Pressure),
            "load" => Ok(Sensor::Load),
            other => Err(CoreError::UnknownSensor(other.to_string())),
        }
    }
}

/// One device's sensor vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub pressure: f64,
    pub load: f64,
}

impl SensorReading {
    pub fn new(temperature: f64, pressure: f64, load: f64) -> Self {
        Self {
            temperature,
            pressure,
            load,
        }
    }

    /// Get a channel value
    pub fn get(&self, sensor: Sensor) -> f64 {
        match sensor {
            Sensor::Temperature => self.temperature,
            Sensor::Pressure => self.pressure,
            Sensor::Load => self.load,
        }
    }

    /// Mutable access to a channel value
    pub fn get_mut(&mut self, sensor: Sensor) -> &mut f64 {
        match sensor {
            Sensor::Temperature => &mut self.temperature,
            Sensor::Pressure => &mut self.pressure,
            Sensor::Load => &mut self.load,
        }
    }

    /// Reset every channel to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn as_array(&self) -> [f64; Sensor::COUNT] {
        [self.temperature, self.pressure, self.load]
    }

    pub fn geometry(&self) -> SensorGeometry {
        SensorGeometry::from_reading(self)
    }
}

/// Geometric quantities derived from a sensor vector.
///
/// `rho2 = x² + y²`, `r = sqrt(rho2 + z²)`, `rho = sqrt(rho2)`,
/// `phi = atan2(y, x)`, `theta = atan2(z, rho)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorGeometry {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
    pub rho: f64,
    pub phi: f64,
    pub theta: f64,
}

impl SensorGeometry {
    pub fn from_reading(reading: &SensorReading) -> Self {
        let x = reading.temperature;
        let y = reading.pressure;
        let z = reading.load;
        let rho2 = x * x + y * y;
        let r = (rho2 + z * z).sqrt();
        let rho = rho2.sqrt();
        Self {
            x,
            y,
            z,
            r,
            rho,
            phi: y.atan2(x),
            theta: z.atan2(rho),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_round_trip_names() {
        for sensor in Sensor::all() {
            assert_eq!(sensor.as_str().parse::<Sensor>().unwrap(), *sensor);
        }
        assert!("humidity".parse::<Sensor>().is_err());
    }

    #[test]
    fn test_sensor_indices_follow_emission_order() {
        let indices: Vec<usize> = Sensor::all().iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_geometry_from_reading() {
        let reading = SensorReading::new(3.0, 4.0, 12.0);
        let g = reading.geometry();
        assert_eq!(g.rho, 5.0);
        assert_eq!(g.r, 13.0);
        assert!((g.phi - 4.0f64.atan2(3.0)).abs() < 1e-12);
        assert!((g.theta - 12.0f64.atan2(5.0)).abs() < 1e-12);
    }

    #[test]
    fn test_geometry_at_origin() {
        let g = SensorReading::default().geometry();
        assert_eq!(g.r, 0.0);
        assert_eq!(g.rho, 0.0);
        assert_eq!(g.phi, 0.0);
        assert_eq!(g.theta, 0.0);
    }

    #[test]
    fn test_reading_accessors() {
        let mut reading = SensorReading::new(1.0, 2.0, 3.0);
        *reading.get_mut(Sensor::Pressure) += 0.5;
        assert_eq!(reading.get(Sensor::Pressure), 2.5);
        assert_eq!(reading.as_array(), [1.0, 2.5, 3.0]);
        reading.reset();
        assert_eq!(reading, SensorReading::default());
    }
}
