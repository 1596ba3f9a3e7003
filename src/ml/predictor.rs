// ============================================================
// Layer 5 — Prediction and Evaluation
// ============================================================
// predict_rings    — run any Regressor over an encoded matrix
// evaluate_model   — root mean squared error
// regression_report — RMSE plus MAE and R² for run tracking

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::domain::traits::Regressor;

/// Predict the ring count for every row of `x`.
pub fn predict_rings<R: Regressor>(x: &[Vec<f64>], model: &R) -> Result<Vec<f64>> {
    model.predict(x)
}

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    ensure!(!y_true.is_empty(), "cannot evaluate on zero samples");
    ensure!(
        y_true.len() == y_pred.len(),
        "targets ({}) and predictions ({}) differ in length",
        y_true.len(),
        y_pred.len()
    );
    Ok(())
}

/// Root mean squared error.
pub fn evaluate_model(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64;
    Ok(mse.sqrt())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub rmse: f64,
    pub mae:  f64,
    /// Coefficient of determination; 0.0 when the targets are constant
    pub r2:   f64,
}

pub fn regression_report(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionReport> {
    let rmse = evaluate_model(y_true, y_pred)?;
    let n    = y_true.len() as f64;

    let mae = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum::<f64>() / n;

    let mean   = y_true.iter().sum::<f64>() / n;
    let ss_tot = y_true.iter().map(|t| (t - mean).powi(2)).sum::<f64>();
    let ss_res = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum::<f64>();
    let r2     = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Ok(RegressionReport { rmse, mae, r2 })
}
