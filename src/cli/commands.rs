// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands and all their flags:
//   train     — one training run
//   predict   — one prediction from flags
//   serve     — the HTTP prediction API
//   schedule  — retrain on a fixed interval
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::schedule_use_case::ScheduleConfig;
use crate::application::train_use_case::TrainConfig;
use crate::domain::abalone::{AbaloneInput, Sex};
use crate::ml::model::ForestConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the ring-count model and persist model + encoder
    Train(TrainArgs),

    /// Predict the ring count of one abalone using saved artifacts
    Predict(PredictArgs),

    /// Serve predictions over HTTP
    Serve(ServeArgs),

    /// Re-run training on a fixed interval
    Schedule(ScheduleArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// CSV file with the labelled abalone data
    #[arg(long, default_value = "data/abalone.csv")]
    pub trainset_path: PathBuf,

    /// Directory for model.bin, encoder.bin and train_config.json
    #[arg(long, default_value = "local_objects")]
    pub artifacts_dir: PathBuf,

    /// Root directory of the experiment tracker
    #[arg(long, default_value = "mlruns")]
    pub tracking_dir: PathBuf,

    /// Experiment name runs are grouped under
    #[arg(long, default_value = "abalone_project")]
    pub experiment: String,

    /// Registry name the trained model is versioned under
    #[arg(long, default_value = "abalone_rf_model")]
    pub registered_model: String,

    /// Fraction of rows held out for testing
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seed for the train/test shuffle
    #[arg(long, default_value_t = 41)]
    pub split_seed: u64,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    pub n_trees: usize,

    /// Maximum tree depth (unbounded when omitted)
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Minimum rows a node needs before it may split
    #[arg(long, default_value_t = 2)]
    pub min_samples_split: usize,

    /// Minimum rows every leaf must keep
    #[arg(long, default_value_t = 1)]
    pub min_samples_leaf: usize,

    /// Features sampled per split (all when omitted)
    #[arg(long)]
    pub max_features: Option<usize>,

    /// Grow every tree on the full training set instead of a bootstrap sample
    #[arg(long)]
    pub no_bootstrap: bool,

    /// Seed for bootstrap sampling and feature sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            trainset_path:    a.trainset_path,
            artifacts_dir:    a.artifacts_dir,
            tracking_dir:     a.tracking_dir,
            experiment:       a.experiment,
            registered_model: a.registered_model,
            test_fraction:    a.test_fraction,
            split_seed:       a.split_seed,
            forest: ForestConfig {
                n_trees:           a.n_trees,
                max_depth:         a.max_depth,
                min_samples_split: a.min_samples_split,
                min_samples_leaf:  a.min_samples_leaf,
                max_features:      a.max_features,
                bootstrap:         !a.no_bootstrap,
                seed:              a.seed,
            },
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Directory the artifacts were saved to during training
    #[arg(long, default_value = "local_objects")]
    pub artifacts_dir: PathBuf,

    /// M, F or I
    #[arg(long)]
    pub sex: Sex,

    #[arg(long)]
    pub diameter: f64,

    #[arg(long)]
    pub height: f64,

    #[arg(long)]
    pub whole_weight: f64,

    #[arg(long)]
    pub shucked_weight: f64,

    #[arg(long)]
    pub viscera_weight: f64,

    #[arg(long)]
    pub shell_weight: f64,
}

impl PredictArgs {
    pub fn to_input(&self) -> AbaloneInput {
        AbaloneInput {
            sex:            self.sex,
            diameter:       self.diameter,
            height:         self.height,
            whole_weight:   self.whole_weight,
            shucked_weight: self.shucked_weight,
            viscera_weight: self.viscera_weight,
            shell_weight:   self.shell_weight,
        }
    }
}

/// All arguments for the `serve` command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Directory with model.bin and encoder.bin
    #[arg(long, default_value = "local_objects")]
    pub artifacts_dir: PathBuf,

    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// CSV file POST /retrain trains on
    #[arg(long, default_value = "data/abalone.csv")]
    pub trainset_path: PathBuf,
}

impl ServeArgs {
    /// Flags passed to `train` when POST /retrain fires
    pub fn retrain_args(&self) -> Vec<String> {
        vec![
            "--trainset-path".to_string(),
            self.trainset_path.display().to_string(),
            "--artifacts-dir".to_string(),
            self.artifacts_dir.display().to_string(),
        ]
    }
}

/// All arguments for the `schedule` command
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub train: TrainArgs,

    /// Seconds between training runs
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,

    /// Stop after this many runs (runs until Ctrl-C when omitted)
    #[arg(long)]
    pub max_runs: Option<usize>,
}

impl From<ScheduleArgs> for ScheduleConfig {
    fn from(a: ScheduleArgs) -> Self {
        ScheduleConfig {
            train:    a.train.into(),
            interval: Duration::from_secs(a.interval_secs.max(1)),
            max_runs: a.max_runs,
        }
    }
}
