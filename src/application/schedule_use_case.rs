// ============================================================
// Layer 2 — Scheduled Retraining
// ============================================================
// Runs the training flow now, then again every `interval`, on a
// tokio interval timer. Each run executes on the blocking pool
// so the timer and the Ctrl-C listener stay responsive.
//
// A failed run is logged and counted; the schedule keeps going.
// The loop ends after `max_runs` attempts (if set) or on Ctrl-C.
//
// Runs never overlap: the next tick is awaited only after the
// current run has returned.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::application::train_use_case::{TrainConfig, TrainUseCase};

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub train:    TrainConfig,
    pub interval: Duration,
    pub max_runs: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed:    usize,
}

pub struct ScheduledTraining {
    config: ScheduleConfig,
}

impl ScheduledTraining {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<ScheduleSummary> {
        let cfg = &self.config;
        tracing::info!(
            "Scheduling training on '{}' every {:?}",
            cfg.train.trainset_path.display(),
            cfg.interval
        );

        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = ScheduleSummary::default();

        loop {
            if let Some(max) = cfg.max_runs {
                if summary.attempted >= max {
                    break;
                }
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted; stopping schedule");
                    break;
                }
            }

            let train_cfg = cfg.train.clone();
            let outcome = tokio::task::spawn_blocking(move || TrainUseCase::new(train_cfg).execute())
                .await
                .context("Training task panicked")?;

            summary.attempted += 1;
            match outcome {
                Ok(report) => {
                    summary.succeeded += 1;
                    tracing::info!(
                        "Scheduled run {} done: test_rmse={:.4}, model version {}",
                        report.run_id,
                        report.test_rmse,
                        report.model_version
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!("Scheduled run failed: {e:#}");
                }
            }
        }

        tracing::info!(
            "Schedule finished: {} runs, {} succeeded, {} failed",
            summary.attempted,
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{test_config, write_synthetic_csv};
    use crate::infra::tracker::ExperimentTracker;

    #[tokio::test]
    async fn test_runs_until_max_runs() {
        let dir = tempfile::tempdir().unwrap();
        let train = test_config(dir.path());
        write_synthetic_csv(&train.trainset_path, 30);

        let schedule = ScheduledTraining::new(ScheduleConfig {
            train:    train.clone(),
            interval: Duration::from_millis(10),
            max_runs: Some(2),
        });
        let summary = schedule.run().await.unwrap();
        assert_eq!(summary, ScheduleSummary { attempted: 2, succeeded: 2, failed: 0 });

        let tracker = ExperimentTracker::new(&train.tracking_dir, &train.experiment);
        let latest  = tracker.latest_version(&train.registered_model).unwrap().unwrap();
        assert_eq!(latest.version, 2);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let schedule = ScheduledTraining::new(ScheduleConfig {
            train:    test_config(dir.path()),
            interval: Duration::from_millis(5),
            max_runs: Some(3),
        });
        let summary = schedule.run().await.unwrap();
        assert_eq!(summary, ScheduleSummary { attempted: 3, succeeded: 0, failed: 3 });
    }
}
