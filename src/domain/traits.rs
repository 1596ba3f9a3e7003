// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two seams the pipeline is written against:
//
//   RecordSource — anything that yields labelled abalone rows
//                  (CsvLoader today)
//   Regressor    — anything that maps a dense feature vector
//                  to a continuous prediction
//                  (RandomForestRegressor today)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::abalone::AbaloneRecord;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Any component that can load the labelled training rows.
pub trait RecordSource {
    /// Load every available record.
    fn load_all(&self) -> Result<Vec<AbaloneRecord>>;
}

// ─── Regressor ────────────────────────────────────────────────────────────────
/// A fitted-or-fittable estimator for a continuous target.
pub trait Regressor {
    /// Fit on a dense design matrix `x` (one row per sample) and targets `y`.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Predict one sample.
    fn predict_one(&self, row: &[f64]) -> Result<f64>;

    /// Predict every row of `x`.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }
}
