// ============================================================
// Layer 5 — Trainer
// ============================================================
// Fits a RandomForestRegressor on an encoded design matrix.
//
// Reference: Breiman (2001) Random Forests

use anyhow::{Context, Result};
use std::time::Instant;

use crate::domain::traits::Regressor;
use crate::ml::model::{ForestConfig, RandomForestRegressor};

pub fn train_model(
    x_train: &[Vec<f64>],
    y_train: &[f64],
    config:  &ForestConfig,
) -> Result<RandomForestRegressor> {
    tracing::info!(
        "Training random forest: {} trees on {} samples × {} features",
        config.n_trees,
        x_train.len(),
        x_train.first().map_or(0, Vec::len),
    );

    let started   = Instant::now();
    let mut model = RandomForestRegressor::new(config.clone());
    model.fit(x_train, y_train).context("Random forest fit failed")?;

    let nodes: usize = model.trees().iter().map(|t| t.node_count()).sum();
    tracing::info!(
        "Forest trained in {:.2?} ({} nodes total)",
        started.elapsed(),
        nodes,
    );
    Ok(model)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_model_returns_fitted_forest() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64>      = (0..20).map(|i| i as f64 * 0.5).collect();
        let cfg = ForestConfig { n_trees: 5, ..ForestConfig::default() };

        let model = train_model(&x, &y, &cfg).unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.trees().len(), 5);
        assert_eq!(model.n_features(), 1);
    }

    #[test]
    fn test_train_model_propagates_fit_errors() {
        let err = train_model(&[], &[], &ForestConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("zero samples"));
    }
}
