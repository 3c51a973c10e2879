//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - Ingestion of historical city observations (CSV, local or over HTTP)
//! - Feature encoding and alignment to the trained column order
//! - A gradient boosted multi-output regressor and its training pipeline
//! - Paired persistence of the model and its feature order
//! - The 7-day forecast projection
//!
//! It is used by `forecast-cli`, but can also be reused by other binaries or services.

pub mod artifact;
pub mod city;
pub mod config;
pub mod error;
pub mod features;
pub mod forecast;
pub mod model;
pub mod observation;
pub mod source;
pub mod training;

pub use artifact::ModelBundle;
pub use city::City;
pub use config::Config;
pub use error::{ForecastError, Result};
pub use features::{FeatureSchema, FeatureVector};
pub use forecast::{ForecastRow, WeatherKind, forecast};
pub use model::{MultiOutputRegressor, Predictor, WeatherTargets};
pub use observation::{Dataset, Observation};
pub use source::{DataSource, SourceKind};
pub use training::{TrainOutcome, TrainingParams, TrainingReport, train};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoosterParams;

    /// One year of synthetic daily readings for every city.
    fn synthetic_csv() -> String {
        let mut csv = String::from("name,datetime,temp,humidity,precip,windspeed\n");
        let start = chrono::NaiveDate::from_ymd_opt(2022, 1, 1).expect("valid date");
        let cities = ["Berlin", "Colonge", "Frankfurt", "Hamburg", "Munich"];
        for (c, city) in cities.iter().enumerate() {
            for d in 0..365i64 {
                let date = start + chrono::Duration::days(d);
                let phase = (d as f64) / 365.0 * std::f64::consts::TAU;
                let temp = 10.0 - 10.0 * phase.cos() + c as f64;
                let precip = ((d * 7 + c as i64) % 5) as f64 * 0.8;
                let humidity = 70.0 + 10.0 * phase.cos();
                let wind = 12.0 + (d % 3) as f64;
                csv.push_str(&format!(
                    "{city},{date},{temp:.2},{humidity:.1},{precip:.1},{wind:.1}\n"
                ));
            }
        }
        csv
    }

    #[test]
    fn train_persist_reload_forecast_is_deterministic() {
        let ds = Dataset::from_csv_str(&synthetic_csv()).expect("parses");
        assert_eq!(ds.cities(), ["Berlin", "Cologne", "Frankfurt", "Hamburg", "Munich"]);

        let params = TrainingParams {
            booster: BoosterParams { n_estimators: 15, max_depth: 4, ..BoosterParams::default() },
            ..TrainingParams::default()
        };
        let outcome = train(&ds, &params).expect("train");

        let dir = tempfile::tempdir().expect("tempdir");
        let model_path = dir.path().join("model.json");
        let features_path = dir.path().join("features.json");
        ModelBundle::new(outcome.model.clone(), outcome.schema.clone())
            .expect("bundle")
            .save(&model_path, &features_path)
            .expect("save");

        let loaded = ModelBundle::load(&model_path, &features_path).expect("load");
        let first = forecast("Cologne", &ds, &loaded.model, &loaded.schema).expect("forecast");
        let second = forecast("Cologne", &ds, &loaded.model, &loaded.schema).expect("forecast");
        let in_memory =
            forecast("Cologne", &ds, &outcome.model, &outcome.schema).expect("forecast");

        assert_eq!(first.len(), 7);
        assert_eq!(first, second);
        assert_eq!(first, in_memory);
        assert_eq!(first[0].date, chrono::NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date"));
    }

    #[test]
    fn typo_and_canonical_city_forecast_identically() {
        let ds = Dataset::from_csv_str(&synthetic_csv()).expect("parses");
        let params = TrainingParams {
            booster: BoosterParams { n_estimators: 5, max_depth: 3, ..BoosterParams::default() },
            ..TrainingParams::default()
        };
        let outcome = train(&ds, &params).expect("train");

        let a = forecast("Colonge", &ds, &outcome.model, &outcome.schema).expect("forecast");
        let b = forecast("Cologne", &ds, &outcome.model, &outcome.schema).expect("forecast");
        assert_eq!(a, b);
    }
}
