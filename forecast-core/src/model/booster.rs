use std::{fmt, sync::Arc};

use gbdt::{
    config::Config as GbdtConfig,
    decision_tree::{Data, DataVec, ValueType},
    gradient_boost::GBDT,
};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Hyper-parameters of the boosted ensemble (squared-error objective).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u32,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self { n_estimators: 300, learning_rate: 0.1, max_depth: 6 }
    }
}

impl BoosterParams {
    fn gbdt_config(&self, n_features: usize) -> GbdtConfig {
        let mut cfg = GbdtConfig::new();
        cfg.set_feature_size(n_features);
        cfg.set_max_depth(self.max_depth);
        cfg.set_iterations(self.n_estimators);
        cfg.set_shrinkage(self.learning_rate as ValueType);
        cfg.set_loss("SquaredError");
        // Full rows and columns every round keep fitting deterministic.
        cfg.set_data_sample_ratio(1.0);
        cfg.set_feature_sample_ratio(1.0);
        cfg
    }
}

/// Boosted trees for one target, fitted on labels centred at `base_score`.
#[derive(Clone, Serialize, Deserialize)]
struct TargetBooster {
    base_score: f64,
    trees: Arc<GBDT>,
}

impl TargetBooster {
    fn fit(x: &[Vec<f64>], y: &[f64], params: &BoosterParams) -> Self {
        let base_score = y.iter().sum::<f64>() / y.len() as f64;
        let n_features = x.first().map_or(0, Vec::len);

        let mut data: DataVec = x
            .iter()
            .zip(y)
            .map(|(row, label)| {
                let centred = (label - base_score) as ValueType;
                Data::new_training_data(to_values(row), 1.0, centred, None)
            })
            .collect();

        let mut trees = GBDT::new(&params.gbdt_config(n_features));
        trees.fit(&mut data);

        Self { base_score, trees: Arc::new(trees) }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let sample: DataVec = vec![Data::new_test_data(to_values(row), None)];
        let residual = self.trees.predict(&sample).first().copied().unwrap_or_default();
        self.base_score + f64::from(residual)
    }
}

fn to_values(row: &[f64]) -> Vec<ValueType> {
    row.iter().map(|v| *v as ValueType).collect()
}

/// One independent booster per output column.
#[derive(Clone, Serialize, Deserialize)]
pub struct MultiOutputRegressor {
    n_features: usize,
    estimators: Vec<TargetBooster>,
}

impl fmt::Debug for MultiOutputRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiOutputRegressor")
            .field("n_features", &self.n_features)
            .field("n_outputs", &self.estimators.len())
            .finish_non_exhaustive()
    }
}

impl MultiOutputRegressor {
    /// `y[i]` holds every target for row `i`; all rows must have the same length.
    pub fn fit(x: &[Vec<f64>], y: &[Vec<f64>], params: &BoosterParams) -> Result<Self> {
        let n_features = x
            .first()
            .map(Vec::len)
            .ok_or_else(|| ForecastError::EmptyDataset("no rows to fit".into()))?;
        if x.len() != y.len() {
            return Err(ForecastError::SchemaMismatch(format!(
                "{} feature rows but {} target rows",
                x.len(),
                y.len()
            )));
        }
        if let Some(bad) = x.iter().position(|row| row.len() != n_features) {
            return Err(ForecastError::SchemaMismatch(format!(
                "row {bad} has {} features, expected {n_features}",
                x[bad].len()
            )));
        }

        let n_outputs = y.first().map_or(0, Vec::len);
        let mut estimators = Vec::with_capacity(n_outputs);
        for output in 0..n_outputs {
            let column: Vec<f64> = y
                .iter()
                .map(|targets| {
                    targets.get(output).copied().ok_or_else(|| {
                        ForecastError::SchemaMismatch(format!(
                            "target row is missing output {output}"
                        ))
                    })
                })
                .collect::<Result<_>>()?;

            tracing::debug!(output, rows = x.len(), trees = params.n_estimators, "fitting booster");
            estimators.push(TargetBooster::fit(x, &column, params));
        }

        Ok(Self { n_features, estimators })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_outputs(&self) -> usize {
        self.estimators.len()
    }

    /// Predict every output for one aligned feature row.
    pub fn predict_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features {
            return Err(ForecastError::SchemaMismatch(format!(
                "model expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        Ok(self.estimators.iter().map(|e| e.predict(row)).collect())
    }
}
