// ============================================================
// Layer 2 — TrainUseCase (Training Flow)
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1:  Start a tracked run          (Layer 6 - infra)
//   Step 2:  Load abalone.csv             (Layer 4 - data)
//   Step 3:  Preprocess every row         (Layer 4 - data)
//   Step 4:  Fit the vectorizer on ALL rows, so train and
//            test share one vocabulary    (Layer 4 - data)
//   Step 5:  Seeded train/test split      (Layer 4 - data)
//   Step 6:  Encode both sets             (Layer 4 - data)
//   Step 7:  Persist the encoder          (Layer 6 - infra)
//   Step 8:  Train the forest             (Layer 5 - ml)
//   Step 9:  Evaluate train / test RMSE   (Layer 5 - ml)
//   Step 10: Log + register the model     (Layer 6 - infra)
//   Step 11: Persist model and config     (Layer 6 - infra)
//
// Any failure marks the run FAILED and aborts with the original
// error; a persistence failure is fatal to the run.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    loader::CsvLoader,
    preprocessor::Preprocessor,
    splitter::split_train_test,
    vectorizer::DictVectorizer,
};
use crate::domain::features::FeatureRecord;
use crate::domain::traits::RecordSource;
use crate::infra::{
    artifact_store::{ArtifactStore, MODEL_FILE},
    tracker::{ExperimentTracker, Run, RunStatus},
};
use crate::ml::{
    model::ForestConfig,
    predictor::{predict_rings, regression_report},
    trainer::train_model,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a training run needs. Saved next to the artifacts
// and logged as run params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub trainset_path:    PathBuf,
    pub artifacts_dir:    PathBuf,
    pub tracking_dir:     PathBuf,
    pub experiment:       String,
    pub registered_model: String,
    pub test_fraction:    f64,
    pub split_seed:       u64,
    pub forest:           ForestConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            trainset_path:    PathBuf::from("data/abalone.csv"),
            artifacts_dir:    PathBuf::from("local_objects"),
            tracking_dir:     PathBuf::from("mlruns"),
            experiment:       "abalone_project".to_string(),
            registered_model: "abalone_rf_model".to_string(),
            test_fraction:    0.2,
            split_seed:       41,
            forest:           ForestConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Flat key/value view used for run params
    fn as_params(&self) -> Vec<(&'static str, String)> {
        let f = &self.forest;
        vec![
            ("trainset_path",     self.trainset_path.display().to_string()),
            ("test_fraction",     self.test_fraction.to_string()),
            ("split_seed",        self.split_seed.to_string()),
            ("n_trees",           f.n_trees.to_string()),
            ("max_depth",         f.max_depth.map_or("None".to_string(), |d| d.to_string())),
            ("min_samples_split", f.min_samples_split.to_string()),
            ("min_samples_leaf",  f.min_samples_leaf.to_string()),
            ("max_features",      f.max_features.map_or("None".to_string(), |m| m.to_string())),
            ("bootstrap",         f.bootstrap.to_string()),
            ("seed",              f.seed.to_string()),
        ]
    }
}

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub run_id:        String,
    pub train_rmse:    f64,
    pub test_rmse:     f64,
    pub test_r2:       f64,
    pub n_train:       usize,
    pub n_test:        usize,
    pub model_version: u32,
    pub model_path:    PathBuf,
    pub encoder_path:  PathBuf,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute the full training flow end to end inside a tracked run.
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg     = &self.config;
        let tracker = ExperimentTracker::new(&cfg.tracking_dir, &cfg.experiment);

        // ── Step 1: Start run ─────────────────────────────────────────────────
        let mut run = tracker.start_run()?;

        match self.run_pipeline(&tracker, &mut run) {
            Ok(report) => {
                run.finish(RunStatus::Finished)?;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("Training run {} failed: {e:#}", run.id());
                if let Err(close_err) = run.finish(RunStatus::Failed) {
                    tracing::warn!("Could not mark run as failed: {close_err:#}");
                }
                Err(e)
            }
        }
    }

    fn run_pipeline(&self, tracker: &ExperimentTracker, run: &mut Run) -> Result<TrainReport> {
        let cfg = &self.config;

        run.set_tags([("model_type", "random_forest"), ("framework", "abalone-pipeline")])?;
        run.log_params(cfg.as_params())?;

        // ── Step 2: Load data ─────────────────────────────────────────────────
        let records = CsvLoader::new(&cfg.trainset_path).load_all()?;
        ensure!(
            !records.is_empty(),
            "Training data '{}' contains no rows",
            cfg.trainset_path.display()
        );

        // ── Step 3: Preprocess all rows ───────────────────────────────────────
        let preprocessor = Preprocessor::new();
        let (features, targets) = preprocessor.process_all(&records);

        // ── Step 4: Fit encoder on the full corpus ────────────────────────────
        let mut encoder = DictVectorizer::new();
        encoder.fit(&features);
        tracing::info!("Encoder vocabulary: {:?}", encoder.feature_names());

        // ── Step 5: Split ─────────────────────────────────────────────────────
        let samples: Vec<(FeatureRecord, f64)> = features.into_iter().zip(targets).collect();
        let (train, test) = split_train_test(samples, cfg.test_fraction, cfg.split_seed);
        ensure!(!train.is_empty(), "Training split is empty");
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        // ── Step 6: Encode ────────────────────────────────────────────────────
        let (train_features, y_train): (Vec<FeatureRecord>, Vec<f64>) = train.into_iter().unzip();
        let (test_features,  y_test):  (Vec<FeatureRecord>, Vec<f64>) = test.into_iter().unzip();
        let x_train = encoder.transform(&train_features);
        let x_test  = encoder.transform(&test_features);

        // ── Step 7: Persist encoder ───────────────────────────────────────────
        let store        = ArtifactStore::new(&cfg.artifacts_dir);
        let encoder_path = store.save_encoder(&encoder)?;

        // ── Step 8: Train ─────────────────────────────────────────────────────
        let model = train_model(&x_train, &y_train, &cfg.forest)?;

        // ── Step 9: Evaluate ──────────────────────────────────────────────────
        let train_pred  = predict_rings(&x_train, &model)?;
        let train_stats = regression_report(&y_train, &train_pred)?;
        run.log_metric("train_rmse", train_stats.rmse)?;

        // A test split can be empty when test_fraction is 0
        let test_stats = if x_test.is_empty() {
            tracing::warn!("Test split is empty; skipping held-out evaluation");
            None
        } else {
            let test_pred = predict_rings(&x_test, &model)?;
            let stats     = regression_report(&y_test, &test_pred)?;
            run.log_metric("test_rmse", stats.rmse)?;
            run.log_metric("test_mae",  stats.mae)?;
            run.log_metric("test_r2",   stats.r2)?;
            Some(stats)
        };

        // ── Step 10: Log + register model ─────────────────────────────────────
        run.log_artifact(MODEL_FILE, &model)?;
        let version = tracker.register_model(&cfg.registered_model, run, MODEL_FILE)?;

        // ── Step 11: Persist model for serving ────────────────────────────────
        let model_path = store.save_model(&model)?;
        store.save_config(cfg)?;

        Ok(TrainReport {
            run_id:        run.id().to_string(),
            train_rmse:    train_stats.rmse,
            test_rmse:     test_stats.as_ref().map_or(f64::NAN, |s| s.rmse),
            test_r2:       test_stats.as_ref().map_or(f64::NAN, |s| s.r2),
            n_train:       x_train.len(),
            n_test:        x_test.len(),
            model_version: version.version,
            model_path,
            encoder_path,
        })
    }
}

// ─── Test Fixtures ────────────────────────────────────────────────────────────
/// Writes a small synthetic abalone CSV where rings grow with shell weight.
#[cfg(test)]
pub(crate) fn write_synthetic_csv(path: &std::path::Path, rows: usize) {
    use std::fmt::Write as _;

    let mut csv = String::from(
        "Sex,Length,Diameter,Height,Whole weight,Shucked weight,Viscera weight,Shell weight,Rings\n",
    );
    for i in 0..rows {
        let sex   = ["M", "F", "I"][i % 3];
        let scale = (i % 20) as f64 / 20.0;
        let shell = 0.05 + 0.4 * scale;
        let rings = 4 + (scale * 16.0).round() as u32;
        writeln!(
            csv,
            "{sex},{:.3},{:.3},{:.3},{:.4},{:.4},{:.4},{:.4},{rings}",
            0.2 + 0.5 * scale,
            0.15 + 0.4 * scale,
            0.05 + 0.15 * scale,
            0.1 + 1.5 * scale,
            0.05 + 0.6 * scale,
            0.02 + 0.3 * scale,
            shell,
        )
        .unwrap();
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, csv).unwrap();
}

/// Config pointing every path into `root`, with a small forest
#[cfg(test)]
pub(crate) fn test_config(root: &std::path::Path) -> TrainConfig {
    TrainConfig {
        trainset_path: root.join("data/abalone.csv"),
        artifacts_dir: root.join("local_objects"),
        tracking_dir:  root.join("mlruns"),
        forest:        ForestConfig { n_trees: 10, ..ForestConfig::default() },
        ..TrainConfig::default()
    }
}
