// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Names and persists the files the serving side depends on.
//
// Layout:
//   local_objects/
//     model.bin          ← fitted RandomForestRegressor (bincode)
//     encoder.bin        ← fitted DictVectorizer (bincode)
//     train_config.json  ← hyperparameters of the run that wrote them
//
// Every save goes through the atomic writer, so a serving process
// that starts mid-retrain loads either the old or the new files,
// never a torn one.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::data::vectorizer::DictVectorizer;
use crate::infra::persist::{load_json, load_object, persist_json, persist_object};
use crate::ml::model::RandomForestRegressor;

pub const MODEL_FILE:   &str = "model.bin";
pub const ENCODER_FILE: &str = "encoder.bin";
pub const CONFIG_FILE:  &str = "train_config.json";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Nothing is created until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.dir.join(ENCODER_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn save_model(&self, model: &RandomForestRegressor) -> Result<PathBuf> {
        let path = self.model_path();
        persist_object(model, &path)
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;
        tracing::info!("Model saved to '{}'", path.display());
        Ok(path)
    }

    pub fn save_encoder(&self, encoder: &DictVectorizer) -> Result<PathBuf> {
        let path = self.encoder_path();
        persist_object(encoder, &path)
            .with_context(|| format!("Failed to save encoder to '{}'", path.display()))?;
        tracing::info!("Encoder saved to '{}'", path.display());
        Ok(path)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<PathBuf> {
        let path = self.config_path();
        persist_json(cfg, &path)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(path)
    }

    pub fn load_model(&self) -> Result<RandomForestRegressor> {
        let path = self.model_path();
        load_object(&path).with_context(|| {
            format!(
                "Cannot load model '{}'. Have you run 'train' first?",
                path.display()
            )
        })
    }

    pub fn load_encoder(&self) -> Result<DictVectorizer> {
        let path = self.encoder_path();
        load_object(&path).with_context(|| {
            format!(
                "Cannot load encoder '{}'. Have you run 'train' first?",
                path.display()
            )
        })
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.config_path();
        load_json(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{FeatureRecord, FeatureValue};
    use crate::domain::traits::Regressor;
    use crate::ml::model::ForestConfig;

    #[test]
    fn test_save_and_load_all_artifacts() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("local_objects"));

        let mut record = FeatureRecord::new();
        record.insert("Height".to_string(), FeatureValue::Number(0.1));
        let mut encoder = DictVectorizer::new();
        encoder.fit(&[record]);

        let mut model = RandomForestRegressor::new(ForestConfig { n_trees: 3, ..ForestConfig::default() });
        model.fit(&[vec![0.1], vec![0.2], vec![0.3]], &[5.0, 7.0, 9.0]).unwrap();

        let cfg = TrainConfig::default();

        store.save_encoder(&encoder).unwrap();
        store.save_model(&model).unwrap();
        store.save_config(&cfg).unwrap();

        assert_eq!(store.load_encoder().unwrap(), encoder);
        assert_eq!(store.load_model().unwrap(), model);
        assert_eq!(store.load_config().unwrap(), cfg);
    }

    #[test]
    fn test_missing_model_hints_at_training() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err   = store.load_model().unwrap_err();
        assert!(format!("{err:#}").contains("run 'train' first"));
    }
}
