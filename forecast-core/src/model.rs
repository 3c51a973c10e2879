use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

pub mod booster;

pub use booster::{BoosterParams, MultiOutputRegressor};

/// Target columns, in model output order.
pub const TARGET_NAMES: [&str; 4] = ["temp", "humidity", "precip", "windspeed"];

/// The four readings the model predicts for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherTargets {
    pub temp: f64,
    pub humidity: f64,
    pub precip: f64,
    pub windspeed: f64,
}

impl WeatherTargets {
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [temp, humidity, precip, windspeed] => Ok(Self {
                temp: *temp,
                humidity: *humidity,
                precip: *precip,
                windspeed: *windspeed,
            }),
            _ => Err(ForecastError::SchemaMismatch(format!(
                "expected {} outputs, got {}",
                TARGET_NAMES.len(),
                values.len()
            ))),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.temp, self.humidity, self.precip, self.windspeed]
    }
}

/// Anything that maps one aligned feature row to the four weather targets.
pub trait Predictor {
    fn predict(&self, features: &[f64]) -> Result<WeatherTargets>;
}

impl Predictor for MultiOutputRegressor {
    fn predict(&self, features: &[f64]) -> Result<WeatherTargets> {
        WeatherTargets::from_slice(&self.predict_row(features)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_from_slice_requires_four_values() {
        let t = WeatherTargets::from_slice(&[1.0, 2.0, 3.0, 4.0]).expect("four outputs");
        assert_eq!(t.to_vec(), vec![1.0, 2.0, 3.0, 4.0]);

        let err = WeatherTargets::from_slice(&[1.0, 2.0]).unwrap_err();
        assert!(err.to_string().contains("expected 4 outputs"));
    }
}
