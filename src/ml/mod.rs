// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// All estimator code lives here. Other layers see only the
// Regressor trait and the fitted RandomForestRegressor value.
//
//   model.rs     — CART regression trees bagged into a forest
//   trainer.rs   — fits a forest from a ForestConfig
//   predictor.rs — batch prediction and regression metrics
//
// Reference: Breiman et al. (1984) Classification and Regression Trees
//            Breiman (2001) Random Forests

/// Random forest regressor and its trees
pub mod model;

/// Training entry point
pub mod trainer;

/// Prediction and RMSE / MAE / R² evaluation
pub mod predictor;
