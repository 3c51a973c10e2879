//! Builds the labelled feature table from history and fits the regressor.

use std::fmt;

use chrono::NaiveDate;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ForecastError, Result},
    features::{FeatureSchema, FeatureVector},
    model::{BoosterParams, MultiOutputRegressor, Predictor, TARGET_NAMES, WeatherTargets},
    observation::Dataset,
};

/// Everything that controls a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    #[serde(flatten)]
    pub booster: BoosterParams,
    /// Share of rows held out for evaluation.
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self { booster: BoosterParams::default(), test_fraction: 0.2, seed: 42 }
    }
}

/// One labelled row: yesterday's readings plus today's calendar facts → today's readings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub city: String,
    pub date: NaiveDate,
    pub features: FeatureVector,
    pub targets: WeatherTargets,
}

/// Sort by (city, date), attach each city's previous-row temp/precip, and drop
/// rows that end up with any missing value. The first row of every city has
/// no predecessor and never appears in the table.
pub fn build_training_table(dataset: &Dataset) -> Vec<TrainingRow> {
    let sorted = dataset.sorted_by_city_and_date();
    let mut table = Vec::with_capacity(sorted.len());

    for pair in sorted.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if prev.name != cur.name {
            continue;
        }

        let (Some(prev_temp), Some(prev_precip)) = (prev.temp, prev.precip) else {
            continue;
        };
        let (Some(temp), Some(humidity), Some(precip), Some(windspeed)) =
            (cur.temp, cur.humidity, cur.precip, cur.windspeed)
        else {
            continue;
        };

        table.push(TrainingRow {
            city: cur.name.clone(),
            date: cur.date,
            features: FeatureVector::encode(cur.date, prev_temp, prev_precip, &cur.name),
            targets: WeatherTargets { temp, humidity, precip, windspeed },
        });
    }

    tracing::info!(
        observations = dataset.len(),
        rows = table.len(),
        "built training table"
    );
    table
}

/// Shuffle row indices with a fixed seed and cut off `ceil(n * test_fraction)`
/// of them for testing. Returns `(train, test)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let train = idx.split_off(n_test.min(n));
    (train, idx)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub target: String,
    pub rmse: f64,
    pub mae: f64,
}

/// Summary of a training run, including held-out error per target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub rows_total: usize,
    pub rows_train: usize,
    pub rows_test: usize,
    pub metrics: Vec<TargetMetrics>,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Rows: {} total, {} train, {} test",
            self.rows_total, self.rows_train, self.rows_test
        )?;
        if self.metrics.is_empty() {
            return writeln!(f, "No held-out rows; evaluation skipped.");
        }
        for m in &self.metrics {
            writeln!(f, "  {:<10} RMSE {:>8.3}  MAE {:>8.3}", m.target, m.rmse, m.mae)?;
        }
        Ok(())
    }
}

/// A fitted model together with the column order it expects.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: MultiOutputRegressor,
    pub schema: FeatureSchema,
    pub report: TrainingReport,
}

pub fn train(dataset: &Dataset, params: &TrainingParams) -> Result<TrainOutcome> {
    let table = build_training_table(dataset);
    if table.is_empty() {
        return Err(ForecastError::EmptyDataset(
            "no rows left after computing lag features and dropping incomplete rows".into(),
        ));
    }

    let schema = FeatureSchema::canonical();
    let x = table
        .iter()
        .map(|row| schema.align(&row.features))
        .collect::<Result<Vec<_>>>()?;
    let y: Vec<Vec<f64>> = table.iter().map(|row| row.targets.to_vec()).collect();

    let (train_idx, test_idx) = train_test_split(table.len(), params.test_fraction, params.seed);
    if train_idx.is_empty() {
        return Err(ForecastError::EmptyDataset(format!(
            "training partition is empty ({} rows, test fraction {})",
            table.len(),
            params.test_fraction
        )));
    }

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| y[i].clone()).collect();

    tracing::info!(
        train = train_idx.len(),
        test = test_idx.len(),
        features = schema.len(),
        "fitting model"
    );
    let model = MultiOutputRegressor::fit(&x_train, &y_train, &params.booster)?;

    let metrics = evaluate(&model, test_idx.iter().map(|&i| (x[i].as_slice(), y[i].as_slice())))?;
    for m in &metrics {
        tracing::info!(target_name = %m.target, rmse = m.rmse, mae = m.mae, "held-out error");
    }

    Ok(TrainOutcome {
        model,
        schema,
        report: TrainingReport {
            rows_total: table.len(),
            rows_train: train_idx.len(),
            rows_test: test_idx.len(),
            metrics,
        },
    })
}

/// Per-target RMSE and MAE over `(features, targets)` pairs. Empty input gives no metrics.
pub fn evaluate<'a, P, I>(model: &P, rows: I) -> Result<Vec<TargetMetrics>>
where
    P: Predictor,
    I: IntoIterator<Item = (&'a [f64], &'a [f64])>,
{
    let mut sq = [0.0; 4];
    let mut abs = [0.0; 4];
    let mut n = 0usize;

    for (features, actual) in rows {
        let predicted = model.predict(features)?.to_vec();
        for (k, (p, a)) in predicted.iter().zip(actual).enumerate() {
            let err = p - a;
            sq[k] += err * err;
            abs[k] += err.abs();
        }
        n += 1;
    }

    if n == 0 {
        return Ok(Vec::new());
    }

    Ok(TARGET_NAMES
        .iter()
        .enumerate()
        .map(|(k, name)| TargetMetrics {
            target: (*name).to_string(),
            rmse: (sq[k] / n as f64).sqrt(),
            mae: abs[k] / n as f64,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;

    fn obs(name: &str, day: u32, temp: f64, precip: f64) -> Observation {
        Observation {
            name: name.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).expect("valid date"),
            temp: Some(temp),
            humidity: Some(70.0),
            precip: Some(precip),
            windspeed: Some(10.0),
        }
    }

    #[test]
    fn lag_comes_from_previous_day_of_same_city() {
        let ds = Dataset::from_observations(vec![
            obs("Berlin", 3, 3.0, 0.3),
            obs("Hamburg", 1, 9.0, 0.9),
            obs("Berlin", 1, 1.0, 0.1),
            obs("Berlin", 2, 2.0, 0.2),
        ]);

        let table = build_training_table(&ds);

        assert_eq!(table.len(), 2);
        let d2 = &table[0];
        assert_eq!(d2.city, "Berlin");
        assert_eq!(d2.date, NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"));
        assert_eq!(d2.features.get("prev_temp"), Some(1.0));
        assert_eq!(d2.features.get("prev_precip"), Some(0.1));
        assert_eq!(d2.targets.temp, 2.0);
        assert_eq!(table[1].features.get("prev_temp"), Some(2.0));
    }

    #[test]
    fn first_row_per_city_is_absent() {
        let ds = Dataset::from_observations(vec![
            obs("Berlin", 1, 1.0, 0.1),
            obs("Berlin", 2, 2.0, 0.2),
            obs("Munich", 1, 5.0, 0.0),
            obs("Munich", 2, 6.0, 0.0),
        ]);

        let table = build_training_table(&ds);
        let day1 = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");

        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|r| r.date != day1));
    }

    #[test]
    fn missing_reading_drops_its_row_and_the_next() {
        let mut gap = obs("Berlin", 2, 2.0, 0.2);
        gap.temp = None;
        let ds = Dataset::from_observations(vec![
            obs("Berlin", 1, 1.0, 0.1),
            gap,
            obs("Berlin", 3, 3.0, 0.3),
            obs("Berlin", 4, 4.0, 0.4),
        ]);

        let table = build_training_table(&ds);

        assert_eq!(table.len(), 1);
        assert_eq!(table[0].features.get("prev_temp"), Some(3.0));
    }

    #[test]
    fn colonge_rows_share_a_lag_chain_with_cologne() {
        let ds = Dataset::from_observations(vec![
            obs("Colonge", 1, 1.0, 0.1),
            obs("Cologne", 2, 2.0, 0.2),
        ]);

        let table = build_training_table(&ds);

        assert_eq!(table.len(), 1);
        assert_eq!(table[0].city, "Cologne");
        assert_eq!(table[0].features.get("prev_temp"), Some(1.0));
        assert_eq!(table[0].features.get("name_Cologne"), Some(1.0));
    }

    #[test]
    fn split_sizes_and_reproducibility() {
        let (train, test) = train_test_split(10, 0.2, 42);
        assert_eq!((train.len(), test.len()), (8, 2));

        let (train2, test2) = train_test_split(10, 0.2, 42);
        assert_eq!(train, train2);
        assert_eq!(test, test2);

        let (_, odd) = train_test_split(11, 0.2, 42);
        assert_eq!(odd.len(), 3);

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn train_rejects_single_row_cities() {
        let ds = Dataset::from_observations(vec![
            obs("Berlin", 1, 1.0, 0.1),
            obs("Munich", 1, 2.0, 0.2),
        ]);

        let err = train(&ds, &TrainingParams::default()).unwrap_err();
        assert!(matches!(err, ForecastError::EmptyDataset(_)));
    }

    #[test]
    fn train_produces_canonical_schema_and_report() {
        let rows: Vec<Observation> = (1..=28)
            .flat_map(|d| {
                let t = f64::from(d);
                [obs("Berlin", d, t, 0.5), obs("Munich", d, t + 3.0, 1.5)]
            })
            .collect();
        let ds = Dataset::from_observations(rows);
        let params = TrainingParams {
            booster: BoosterParams { n_estimators: 20, ..BoosterParams::default() },
            ..TrainingParams::default()
        };

        let outcome = train(&ds, &params).expect("training succeeds");

        assert_eq!(outcome.schema, FeatureSchema::canonical());
        assert_eq!(outcome.model.n_features(), 13);
        assert_eq!(outcome.model.n_outputs(), 4);
        assert_eq!(outcome.report.rows_total, 54);
        assert_eq!(outcome.report.rows_test, 11);
        assert_eq!(outcome.report.rows_train, 43);
        assert_eq!(outcome.report.metrics.len(), 4);
        assert!(outcome.report.to_string().contains("humidity"));
    }
}
