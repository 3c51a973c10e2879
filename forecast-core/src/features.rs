//! Feature encoding and alignment to the canonical column order.
//!
//! A [`FeatureVector`] is a sparse name → value mapping built from one anchor
//! observation. Before it reaches a model it must be aligned with
//! [`FeatureSchema::align`], which lays it out in the column order the model
//! was trained with.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    city::City,
    error::{ForecastError, Result},
};

/// Calendar and lag features, in encoding order.
pub const BASE_FEATURES: [&str; 8] =
    ["year", "month", "day", "dayofweek", "is_weekend", "season", "prev_temp", "prev_precip"];

/// `(month % 12) / 3 + 1`: December through February map to 1, March through
/// May to 2, June through August to 3, September through November to 4.
pub fn season(month: u32) -> u32 {
    (month % 12) / 3 + 1
}

/// Sparse feature mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encode one day for a city. `prev_temp`/`prev_precip` are carried as given.
    ///
    /// An unrecognised city produces all five indicators set to 0.
    pub fn encode(date: NaiveDate, prev_temp: f64, prev_precip: f64, city: &str) -> Self {
        let dayofweek = date.weekday().num_days_from_monday();
        let target = City::from_name(city);

        let mut v = Self::new();
        v.insert("year", f64::from(date.year()));
        v.insert("month", f64::from(date.month()));
        v.insert("day", f64::from(date.day()));
        v.insert("dayofweek", f64::from(dayofweek));
        v.insert("is_weekend", if dayofweek >= 5 { 1.0 } else { 0.0 });
        v.insert("season", f64::from(season(date.month())));
        v.insert("prev_temp", prev_temp);
        v.insert("prev_precip", prev_precip);

        for c in City::all() {
            let hot = if target == Some(*c) { 1.0 } else { 0.0 };
            v.insert(c.indicator_column(), hot);
        }

        v
    }
}

/// Ordered feature names shared by training and inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn from_columns(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// The schema produced by training: every base feature plus one indicator
    /// per known city, sorted lexicographically.
    pub fn canonical() -> Self {
        let mut columns: Vec<String> = BASE_FEATURES
            .iter()
            .map(|s| (*s).to_string())
            .chain(City::all().iter().map(City::indicator_column))
            .collect();
        columns.sort();

        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Lay `vector` out in schema order. Columns the vector lacks become 0 and
    /// columns the schema lacks are dropped.
    ///
    /// Fails only when the vector shares no column at all with a non-empty schema.
    pub fn align(&self, vector: &FeatureVector) -> Result<Vec<f64>> {
        let mut matched = 0usize;
        let dense: Vec<f64> = self
            .columns
            .iter()
            .map(|col| match vector.get(col) {
                Some(v) => {
                    matched += 1;
                    v
                }
                None => 0.0,
            })
            .collect();

        if matched == 0 && !self.columns.is_empty() {
            return Err(ForecastError::SchemaMismatch(format!(
                "none of the {} vector columns appear in the {}-column schema",
                vector.len(),
                self.columns.len()
            )));
        }

        Ok(dense)
    }

    /// Rebuild a sparse vector from values already in schema order.
    pub fn to_vector(&self, dense: &[f64]) -> FeatureVector {
        let mut v = FeatureVector::new();
        for (col, value) in self.columns.iter().zip(dense) {
            v.insert(col.clone(), *value);
        }
        v
    }

    /// Hex SHA-256 of the column order; used to pair a model with its schema.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for col in &self.columns {
            hasher.update(col.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}
