//! Seven-day projection from a city's last known observation.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    city::canonical_name,
    error::{ForecastError, Result},
    features::{FeatureSchema, FeatureVector},
    model::Predictor,
    observation::Dataset,
};

pub const HORIZON_DAYS: i64 = 7;

/// One projected day. Readings are rounded to one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub temp: f64,
    pub humidity: f64,
    pub precip: f64,
    pub windspeed: f64,
}

impl ForecastRow {
    /// Short display form of the date, e.g. `Thu 11 Jan`.
    pub fn date_label(&self) -> String {
        self.date.format("%a %d %b").to_string()
    }

    pub fn kind(&self) -> WeatherKind {
        WeatherKind::classify(self.temp, self.precip)
    }
}

/// Coarse label used for the headline of a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherKind {
    Sunny,
    Rainy,
    Cloudy,
}

impl WeatherKind {
    pub fn classify(temp: f64, precip: f64) -> Self {
        if temp > 22.0 && precip < 1.0 {
            WeatherKind::Sunny
        } else if precip > 2.0 {
            WeatherKind::Rainy
        } else {
            WeatherKind::Cloudy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherKind::Sunny => "sunny",
            WeatherKind::Rainy => "rainy",
            WeatherKind::Cloudy => "cloudy",
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Project the seven days after the latest date in the whole dataset.
///
/// Every day is encoded with the same lag values, taken from the city's own
/// last observation; predictions are never fed back as the next day's lag.
pub fn forecast<P: Predictor + ?Sized>(
    city: &str,
    dataset: &Dataset,
    model: &P,
    schema: &FeatureSchema,
) -> Result<Vec<ForecastRow>> {
    let city = canonical_name(city);
    let anchor_date = dataset.global_max_date().ok_or_else(|| {
        ForecastError::EmptyDataset("no observations to anchor the forecast".into())
    })?;
    let last = dataset
        .last_for_city(&city)
        .ok_or_else(|| ForecastError::NoObservations(city.clone()))?;

    let missing = |field: &'static str| ForecastError::MissingReading {
        city: city.clone(),
        date: last.date,
        field,
    };
    let prev_temp = last.temp.ok_or_else(|| missing("temp"))?;
    let prev_precip = last.precip.ok_or_else(|| missing("precip"))?;

    tracing::debug!(
        %city,
        %anchor_date,
        last_date = %last.date,
        prev_temp,
        prev_precip,
        "projecting forecast"
    );

    (1..=HORIZON_DAYS)
        .map(|i| {
            let date = anchor_date + Duration::days(i);
            let features = FeatureVector::encode(date, prev_temp, prev_precip, &city);
            let predicted = model.predict(&schema.align(&features)?)?;

            Ok(ForecastRow {
                date,
                temp: round1(predicted.temp),
                humidity: round1(predicted.humidity),
                precip: round1(predicted.precip),
                windspeed: round1(predicted.windspeed),
            })
        })
        .collect()
}
