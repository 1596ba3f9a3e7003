// ============================================================
// Layer 2 — Prediction Use Case
// ============================================================
// ServiceContext holds everything needed to answer a prediction:
// the fitted forest, the fitted encoder, and the preprocessor.
// It is loaded once (at service start, or once per CLI call) and
// then passed explicitly to whoever needs it; the HTTP layer
// shares it behind an Arc.
//
//   AbaloneInput ─► Preprocessor ─► DictVectorizer ─► Forest ─► rings

use anyhow::{Context, Result};

use crate::data::{preprocessor::Preprocessor, vectorizer::DictVectorizer};
use crate::domain::abalone::AbaloneInput;
use crate::domain::traits::Regressor;
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::model::RandomForestRegressor;

pub struct ServiceContext {
    model:        RandomForestRegressor,
    encoder:      DictVectorizer,
    preprocessor: Preprocessor,
}

impl ServiceContext {
    pub fn new(model: RandomForestRegressor, encoder: DictVectorizer) -> Self {
        Self { model, encoder, preprocessor: Preprocessor::new() }
    }

    /// Load the persisted model and encoder.
    pub fn load(store: &ArtifactStore) -> Result<Self> {
        let encoder = store.load_encoder()?;
        let model   = store.load_model()?;
        anyhow::ensure!(
            model.n_features() == encoder.n_features(),
            "Model expects {} features but encoder produces {}; artifacts are from different runs",
            model.n_features(),
            encoder.n_features()
        );
        tracing::info!(
            "Loaded model ({} trees) and encoder ({} features) from '{}'",
            model.trees().len(),
            encoder.n_features(),
            store.dir().display()
        );
        Ok(Self::new(model, encoder))
    }

    /// Predicted ring count for one abalone.
    pub fn predict(&self, input: &AbaloneInput) -> Result<f64> {
        let features = self.preprocessor.process(input);
        let row      = self.encoder.transform_one(&features);
        let rings    = self.model.predict_one(&row).context("Prediction failed")?;
        tracing::debug!("Predicted {:.3} rings for {:?}", rings, input);
        Ok(rings)
    }

    pub fn encoder(&self) -> &DictVectorizer {
        &self.encoder
    }
}
