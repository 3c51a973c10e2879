//! Persistence of the fitted model and its feature order.
//!
//! The two are written as separate files but are only ever loaded as a pair:
//! the model file records the SHA-256 fingerprint of the feature order it was
//! trained against, and [`ModelBundle::load`] refuses a pair that disagrees.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ForecastError, Result},
    features::FeatureSchema,
    model::{MultiOutputRegressor, TARGET_NAMES},
};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    format_version: u32,
    feature_count: usize,
    feature_fingerprint: String,
    targets: Vec<String>,
    model: MultiOutputRegressor,
}

/// A model and the column order it expects.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub model: MultiOutputRegressor,
    pub schema: FeatureSchema,
}

impl ModelBundle {
    pub fn new(model: MultiOutputRegressor, schema: FeatureSchema) -> Result<Self> {
        if model.n_features() != schema.len() {
            return Err(ForecastError::SchemaMismatch(format!(
                "model was fitted on {} features but the schema lists {}",
                model.n_features(),
                schema.len()
            )));
        }
        Ok(Self { model, schema })
    }

    /// Write the model artifact and the feature-order artifact.
    pub fn save(&self, model_path: &Path, features_path: &Path) -> Result<()> {
        let artifact = ModelArtifact {
            format_version: FORMAT_VERSION,
            feature_count: self.schema.len(),
            feature_fingerprint: self.schema.fingerprint(),
            targets: TARGET_NAMES.iter().map(|s| (*s).to_string()).collect(),
            model: self.model.clone(),
        };

        write_json(model_path, &artifact, false)?;
        write_json(features_path, &self.schema, true)?;

        tracing::info!(
            model = %model_path.display(),
            features = %features_path.display(),
            fingerprint = %artifact.feature_fingerprint,
            "saved model artifacts"
        );
        Ok(())
    }

    /// Load both artifacts and verify they belong together.
    pub fn load(model_path: &Path, features_path: &Path) -> Result<Self> {
        let artifact: ModelArtifact = read_json(model_path)?;
        let schema: FeatureSchema = read_json(features_path)?;

        if artifact.format_version != FORMAT_VERSION {
            return Err(ForecastError::Artifact(format!(
                "unsupported format version {} in {} (expected {FORMAT_VERSION})",
                artifact.format_version,
                model_path.display()
            )));
        }
        if artifact.targets != TARGET_NAMES {
            return Err(ForecastError::Artifact(format!(
                "model predicts {:?}, expected {:?}",
                artifact.targets, TARGET_NAMES
            )));
        }

        let fingerprint = schema.fingerprint();
        if artifact.feature_fingerprint != fingerprint {
            return Err(ForecastError::SchemaMismatch(format!(
                "{} was trained with a different feature order than {} lists",
                model_path.display(),
                features_path.display()
            )));
        }
        if artifact.feature_count != artifact.model.n_features() {
            return Err(ForecastError::Artifact(format!(
                "feature count {} disagrees with the stored model ({})",
                artifact.feature_count,
                artifact.model.n_features()
            )));
        }

        tracing::debug!(%fingerprint, features = schema.len(), "loaded model artifacts");
        Self::new(artifact.model, schema)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value)?;
    } else {
        serde_json::to_writer(&mut writer, value)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoosterParams;

    fn fitted(n_features: usize) -> MultiOutputRegressor {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| (0..n_features).map(|f| f64::from(i * (f as i32 + 1) % 7) / 3.0).collect())
            .collect();
        let y: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let t = f64::from(i) * 0.37;
                vec![t, 50.0 + t, t / 10.0, 12.0 - t]
            })
            .collect();
        let params = BoosterParams { n_estimators: 10, ..BoosterParams::default() };
        MultiOutputRegressor::fit(&x, &y, &params).expect("fit")
    }

    #[test]
    fn save_then_load_is_exact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model_path = dir.path().join("nested/model.json");
        let features_path = dir.path().join("features.json");

        let schema = FeatureSchema::canonical();
        let bundle = ModelBundle::new(fitted(schema.len()), schema).expect("bundle");
        bundle.save(&model_path, &features_path).expect("save");

        let loaded = ModelBundle::load(&model_path, &features_path).expect("load");
        assert_eq!(loaded.schema, bundle.schema);
        let row: Vec<f64> = (0..bundle.schema.len()).map(|f| f as f64 / 4.0).collect();
        assert_eq!(
            loaded.model.predict_row(&row).expect("loaded"),
            bundle.model.predict_row(&row).expect("in memory")
        );
    }

    #[test]
    fn features_file_is_a_plain_array() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model_path = dir.path().join("model.json");
        let features_path = dir.path().join("features.json");

        let schema = FeatureSchema::canonical();
        ModelBundle::new(fitted(schema.len()), schema.clone())
            .expect("bundle")
            .save(&model_path, &features_path)
            .expect("save");

        let text = fs::read_to_string(&features_path).expect("read");
        let cols: Vec<String> = serde_json::from_str(&text).expect("array of strings");
        assert_eq!(cols, schema.columns());
    }

    #[test]
    fn mismatched_feature_order_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model_path = dir.path().join("model.json");
        let features_path = dir.path().join("features.json");

        let schema = FeatureSchema::canonical();
        ModelBundle::new(fitted(schema.len()), schema.clone())
            .expect("bundle")
            .save(&model_path, &features_path)
            .expect("save");

        let mut reversed = schema.columns().to_vec();
        reversed.reverse();
        fs::write(&features_path, serde_json::to_string(&reversed).expect("json")).expect("write");

        let err = ModelBundle::load(&model_path, &features_path).unwrap_err();
        assert!(matches!(err, ForecastError::SchemaMismatch(_)));
    }

    #[test]
    fn bundle_requires_matching_width() {
        let err = ModelBundle::new(fitted(3), FeatureSchema::canonical()).unwrap_err();
        assert!(err.to_string().contains("fitted on 3 features"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ModelBundle::load(&dir.path().join("nope.json"), &dir.path().join("f.json"))
            .unwrap_err();
        assert!(matches!(err, ForecastError::Io(_)));
    }
}
