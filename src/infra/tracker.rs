// ============================================================
// Layer 6 — Experiment Tracker
// ============================================================
// A local, file-backed record of training runs: tags, params,
// metrics, artifacts, and a registry of model versions.
//
// Layout (default root: mlruns/):
//   mlruns/
//     abalone_project/
//       metrics.csv                 ← run_id,key,value,timestamp (append-only)
//       <run_id>/
//         run.json                  ← RunInfo, rewritten atomically
//         artifacts/model.bin       ← logged artifacts (bincode)
//     registry/
//       abalone_rf_model/
//         version-1.json            ← ModelVersion
//         version-2.json
//
// Example metrics.csv:
//   run_id,key,value,timestamp
//   5b0c…,train_rmse,0.812345,2026-10-19T08:00:01Z
//   5b0c…,test_rmse,2.153300,2026-10-19T08:00:01Z
//
// Registry versions are numbered from 1 by scanning the existing
// files; two processes registering at once are not coordinated.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use uuid::Uuid;

use crate::infra::persist::{load_json, persist_json, persist_object};

const RUN_FILE:      &str = "run.json";
const METRICS_FILE:  &str = "metrics.csv";
const REGISTRY_DIR:  &str = "registry";
const ARTIFACTS_DIR: &str = "artifacts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Everything recorded about one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id:     String,
    pub experiment: String,
    pub status:     RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time:   Option<DateTime<Utc>>,
    pub tags:       BTreeMap<String, String>,
    pub params:     BTreeMap<String, String>,
    pub metrics:    BTreeMap<String, f64>,
    pub artifacts:  Vec<String>,
}

/// One registered version of a named model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name:          String,
    pub version:       u32,
    pub run_id:        String,
    /// runs:/<run_id>/<artifact>
    pub source:        String,
    pub artifact_path: PathBuf,
    pub created_at:    DateTime<Utc>,
}

pub struct ExperimentTracker {
    root:       PathBuf,
    experiment: String,
}

impl ExperimentTracker {
    pub fn new(root: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self { root: root.into(), experiment: experiment.into() }
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn experiment_dir(&self) -> PathBuf {
        self.root.join(&self.experiment)
    }

    pub fn metrics_csv(&self) -> PathBuf {
        self.experiment_dir().join(METRICS_FILE)
    }

    /// Open a new run in RUNNING state and write its run.json.
    pub fn start_run(&self) -> Result<Run> {
        let run_id = Uuid::new_v4().simple().to_string();
        let dir    = self.experiment_dir().join(&run_id);

        let run = Run {
            info: RunInfo {
                run_id,
                experiment: self.experiment.clone(),
                status:     RunStatus::Running,
                start_time: Utc::now(),
                end_time:   None,
                tags:       BTreeMap::new(),
                params:     BTreeMap::new(),
                metrics:    BTreeMap::new(),
                artifacts:  Vec::new(),
            },
            dir,
            metrics_csv: self.metrics_csv(),
        };
        run.save()?;

        tracing::info!(
            "Started run {} in experiment '{}'",
            run.id(),
            self.experiment
        );
        Ok(run)
    }

    pub fn load_run(&self, run_id: &str) -> Result<RunInfo> {
        let path = self.experiment_dir().join(run_id).join(RUN_FILE);
        load_json(&path).with_context(|| format!("Cannot read run '{}'", path.display()))
    }

    fn registry_dir(&self, name: &str) -> PathBuf {
        self.root.join(REGISTRY_DIR).join(name)
    }

    /// Every registered version of `name`, oldest first.
    pub fn model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        let dir = self.registry_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Cannot read registry '{}'", dir.display()))?
        {
            let path = entry?.path();
            let is_version = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("version-") && n.ends_with(".json"));
            if is_version {
                let v: ModelVersion = load_json(&path)
                    .with_context(|| format!("Corrupt registry entry '{}'", path.display()))?;
                versions.push(v);
            }
        }
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    pub fn latest_version(&self, name: &str) -> Result<Option<ModelVersion>> {
        Ok(self.model_versions(name)?.pop())
    }

    /// Register an artifact previously logged on `run` as the next version of `name`.
    pub fn register_model(&self, name: &str, run: &Run, artifact: &str) -> Result<ModelVersion> {
        let artifact_path = run.artifacts_dir().join(artifact);
        anyhow::ensure!(
            artifact_path.exists(),
            "Run {} has no artifact '{}'",
            run.id(),
            artifact
        );

        let version = self
            .latest_version(name)?
            .map_or(1, |v| v.version + 1);

        let mv = ModelVersion {
            name: name.to_string(),
            version,
            run_id: run.id().to_string(),
            source: format!("runs:/{}/{}", run.id(), artifact),
            artifact_path,
            created_at: Utc::now(),
        };

        let path = self.registry_dir(name).join(format!("version-{version}.json"));
        persist_json(&mv, &path)
            .with_context(|| format!("Cannot register model at '{}'", path.display()))?;

        tracing::info!("Registered model '{}' version {}", name, version);
        Ok(mv)
    }
}

/// A run in progress. Every mutation is written through to run.json.
pub struct Run {
    info:        RunInfo,
    dir:         PathBuf,
    metrics_csv: PathBuf,
}

impl Run {
    pub fn id(&self) -> &str {
        &self.info.run_id
    }

    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.dir.join(ARTIFACTS_DIR)
    }

    fn save(&self) -> Result<()> {
        let path = self.dir.join(RUN_FILE);
        persist_json(&self.info, &path)
            .with_context(|| format!("Cannot write run metadata '{}'", path.display()))
    }

    pub fn set_tags<I, K, V>(&mut self, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.info
            .tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self.save()
    }

    pub fn log_params<I, K, V>(&mut self, params: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.info
            .params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self.save()
    }

    /// Record a metric on the run and append it to the experiment's metrics.csv.
    pub fn log_metric(&mut self, key: &str, value: f64) -> Result<()> {
        self.info.metrics.insert(key.to_string(), value);
        self.save()?;
        self.append_metric_row(key, value)?;
        tracing::info!("[run {}] {} = {:.6}", self.id(), key, value);
        Ok(())
    }

    fn append_metric_row(&self, key: &str, value: f64) -> Result<()> {
        if let Some(parent) = self.metrics_csv.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write the header row only if the file is new
        let is_new = !self.metrics_csv.exists();
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.metrics_csv)
            .with_context(|| format!("Cannot open '{}'", self.metrics_csv.display()))?;
        if is_new {
            writeln!(f, "run_id,key,value,timestamp")?;
        }
        writeln!(
            f,
            "{},{},{:.6},{}",
            self.info.run_id,
            key,
            value,
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        )?;
        Ok(())
    }

    /// Persist `artifact` under this run's artifacts/ directory.
    pub fn log_artifact<T: Serialize + ?Sized>(&mut self, name: &str, artifact: &T) -> Result<PathBuf> {
        let path = self.artifacts_dir().join(name);
        persist_object(artifact, &path)
            .with_context(|| format!("Cannot log artifact '{}'", path.display()))?;
        if !self.info.artifacts.iter().any(|a| a == name) {
            self.info.artifacts.push(name.to_string());
        }
        self.save()?;
        Ok(path)
    }

    /// Close the run with a final status.
    pub fn finish(mut self, status: RunStatus) -> Result<RunInfo> {
        self.info.status   = status;
        self.info.end_time = Some(Utc::now());
        self.save()?;
        tracing::info!("Run {} finished with status {:?}", self.id(), status);
        Ok(self.info)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_lifecycle_is_recorded() {
        let dir     = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::new(dir.path(), "abalone_project");

        let mut run = tracker.start_run().unwrap();
        let run_id  = run.id().to_string();
        assert_eq!(tracker.load_run(&run_id).unwrap().status, RunStatus::Running);

        run.set_tags([("model_type", "random_forest")]).unwrap();
        run.log_params([("n_trees", 100)]).unwrap();
        run.log_metric("train_rmse", 0.75).unwrap();
        let info = run.finish(RunStatus::Finished).unwrap();

        let stored = tracker.load_run(&run_id).unwrap();
        assert_eq!(stored, info);
        assert_eq!(stored.status, RunStatus::Finished);
        assert!(stored.end_time.is_some());
        assert_eq!(stored.tags["model_type"], "random_forest");
        assert_eq!(stored.params["n_trees"], "100");
        assert_eq!(stored.metrics["train_rmse"], 0.75);
    }

    #[test]
    fn test_metrics_csv_has_single_header() {
        let dir     = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::new(dir.path(), "exp");

        for _ in 0..2 {
            let mut run = tracker.start_run().unwrap();
            run.log_metric("test_rmse", 2.0).unwrap();
            run.finish(RunStatus::Finished).unwrap();
        }

        let csv   = fs::read_to_string(tracker.metrics_csv()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "run_id,key,value,timestamp");
        assert_eq!(csv.matches("run_id,key").count(), 1);
        assert!(lines[1].contains(",test_rmse,2.000000,"));
    }

    #[test]
    fn test_registry_versions_increment() {
        let dir     = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::new(dir.path(), "exp");

        for expected in 1..=2 {
            let mut run = tracker.start_run().unwrap();
            run.log_artifact("model.bin", &vec![1u8, 2, 3]).unwrap();
            let mv = tracker.register_model("abalone_rf_model", &run, "model.bin").unwrap();
            assert_eq!(mv.version, expected);
            assert_eq!(mv.source, format!("runs:/{}/model.bin", run.id()));
            run.finish(RunStatus::Finished).unwrap();
        }

        let latest = tracker.latest_version("abalone_rf_model").unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(tracker.model_versions("abalone_rf_model").unwrap().len(), 2);
    }

    #[test]
    fn test_register_requires_logged_artifact() {
        let dir     = tempfile::tempdir().unwrap();
        let tracker = ExperimentTracker::new(dir.path(), "exp");
        let run     = tracker.start_run().unwrap();
        assert!(tracker.register_model("m", &run, "model.bin").is_err());
        assert!(tracker.latest_version("m").unwrap().is_none());
    }
}
