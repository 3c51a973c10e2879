//! Historical observations and CSV ingestion.

use std::{collections::BTreeSet, io::Read};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
    city::canonical_name,
    error::{ForecastError, Result},
};

/// Columns every historical export must carry. Other columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 6] =
    ["name", "datetime", "temp", "humidity", "precip", "windspeed"];

/// One reading per (city, day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub name: String,
    pub date: NaiveDate,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub precip: Option<f64>,
    pub windspeed: Option<f64>,
}

/// Immutable set of observations, loaded once and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    observations: Vec<Observation>,
    dropped_dates: usize,
}

impl Dataset {
    /// Build a dataset from already-parsed observations, canonicalizing city names.
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        let observations = observations
            .into_iter()
            .map(|mut obs| {
                obs.name = canonical_name(&obs.name);
                obs
            })
            .collect();

        Self { observations, dropped_dates: 0 }
    }

    /// Parse CSV text. Rows whose `datetime` cannot be parsed are dropped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);

        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or(ForecastError::MissingColumn(name))
        };
        let [name_idx, date_idx, temp_idx, humidity_idx, precip_idx, wind_idx] = [
            column(REQUIRED_COLUMNS[0])?,
            column(REQUIRED_COLUMNS[1])?,
            column(REQUIRED_COLUMNS[2])?,
            column(REQUIRED_COLUMNS[3])?,
            column(REQUIRED_COLUMNS[4])?,
            column(REQUIRED_COLUMNS[5])?,
        ];

        let mut observations = Vec::new();
        let mut dropped_dates = 0;

        for record in reader.records() {
            let record = record?;
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let Some(date) = parse_date(field(date_idx)) else {
                dropped_dates += 1;
                continue;
            };

            observations.push(Observation {
                name: canonical_name(field(name_idx)),
                date,
                temp: parse_reading(field(temp_idx)),
                humidity: parse_reading(field(humidity_idx)),
                precip: parse_reading(field(precip_idx)),
                windspeed: parse_reading(field(wind_idx)),
            });
        }

        if dropped_dates > 0 {
            tracing::warn!(dropped = dropped_dates, "dropped rows with unparsable datetime");
        }
        tracing::info!(rows = observations.len(), "loaded observations");

        Ok(Self { observations, dropped_dates })
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of rows discarded at ingestion because of an unparsable date.
    pub fn dropped_dates(&self) -> usize {
        self.dropped_dates
    }

    /// Latest date across every city.
    pub fn global_max_date(&self) -> Option<NaiveDate> {
        self.observations.iter().map(|o| o.date).max()
    }

    /// Chronologically last observation of a city; the name is canonicalized first.
    /// On duplicate dates the row appearing last in the input wins.
    pub fn last_for_city(&self, city: &str) -> Option<&Observation> {
        let city = canonical_name(city);
        self.observations
            .iter()
            .filter(|o| o.name == city)
            .fold(None, |best: Option<&Observation>, o| match best {
                Some(b) if b.date > o.date => Some(b),
                _ => Some(o),
            })
    }

    /// Distinct city names present in the data, sorted.
    pub fn cities(&self) -> Vec<String> {
        self.observations
            .iter()
            .map(|o| o.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Observations ordered by (city, date); ties keep input order.
    pub fn sorted_by_city_and_date(&self) -> Vec<&Observation> {
        let mut rows: Vec<&Observation> = self.observations.iter().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.date.cmp(&b.date)));
        rows
    }
}

/// Parse the date part of a datetime cell. Returns `None` for anything unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }

    const DATETIME_FORMATS: [&str; 4] =
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

fn parse_reading(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
