// ============================================================
// Layer 4 — Dictionary Vectorizer (Feature Encoder)
// ============================================================
// Maps FeatureRecords to fixed-width dense vectors.
//
// fit() walks a corpus once and learns a vocabulary:
//   Number(v)   under "Height"       → feature "Height",   value v
//   Category(s) under "Sex"          → feature "Sex=s",    value 1.0
//
// Feature names are sorted, and each name's position in that
// order is its column index. transform() reuses the learned
// vocabulary for every later record; names it has never seen
// are ignored, so their contribution is an all-zero column.
//
// The fitted vectorizer is persisted next to the model so the
// serving process encodes requests exactly as training did.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::features::{FeatureRecord, FeatureValue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictVectorizer {
    /// Feature name → column index
    vocabulary: BTreeMap<String, usize>,
    /// Column index → feature name
    feature_names: Vec<String>,
}

/// Vocabulary key for one attribute
fn feature_key(name: &str, value: &FeatureValue) -> String {
    match value {
        FeatureValue::Number(_)   => name.to_string(),
        FeatureValue::Category(c) => format!("{name}={c}"),
    }
}

/// Column value for one attribute
fn feature_value(value: &FeatureValue) -> f64 {
    match value {
        FeatureValue::Number(v)   => *v,
        FeatureValue::Category(_) => 1.0,
    }
}

impl DictVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the vocabulary from a corpus, replacing any previous fit.
    pub fn fit(&mut self, records: &[FeatureRecord]) -> &mut Self {
        let names: BTreeSet<String> = records
            .iter()
            .flat_map(|r| r.iter().map(|(name, value)| feature_key(name, value)))
            .collect();

        self.feature_names = names.into_iter().collect();
        self.vocabulary = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        tracing::debug!("Vectorizer fitted with {} features", self.feature_names.len());
        self
    }

    /// Encode one record against the learned vocabulary
    pub fn transform_one(&self, record: &FeatureRecord) -> Vec<f64> {
        let mut row = vec![0.0; self.feature_names.len()];
        for (name, value) in record {
            if let Some(&col) = self.vocabulary.get(&feature_key(name, value)) {
                row[col] = feature_value(value);
            }
        }
        row
    }

    pub fn transform(&self, records: &[FeatureRecord]) -> Vec<Vec<f64>> {
        records.iter().map(|r| self.transform_one(r)).collect()
    }

    pub fn fit_transform(&mut self, records: &[FeatureRecord]) -> Vec<Vec<f64>> {
        self.fit(records);
        self.transform(records)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, FeatureValue)]) -> FeatureRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let corpus = vec![
            rec(&[("b", 1.0.into()), ("a", 2.0.into())]),
            rec(&[("colour", "red".into())]),
            rec(&[("colour", "blue".into())]),
        ];
        let mut dv = DictVectorizer::new();
        dv.fit(&corpus);
        assert_eq!(dv.feature_names(), &["a", "b", "colour=blue", "colour=red"]);
    }

    #[test]
    fn test_transform_numeric_and_categorical() {
        let corpus = vec![
            rec(&[("h", 0.5.into()), ("colour", "red".into())]),
            rec(&[("h", 0.7.into()), ("colour", "blue".into())]),
        ];
        let mut dv = DictVectorizer::new();
        let x = dv.fit_transform(&corpus);
        // columns: colour=blue, colour=red, h
        assert_eq!(x[0], vec![0.0, 1.0, 0.5]);
        assert_eq!(x[1], vec![1.0, 0.0, 0.7]);
    }

    #[test]
    fn test_unseen_features_are_ignored() {
        let mut dv = DictVectorizer::new();
        dv.fit(&[rec(&[("h", 1.0.into()), ("colour", "red".into())])]);

        let row = dv.transform_one(&rec(&[
            ("colour", "green".into()),
            ("weight", 3.0.into()),
            ("h", 2.0.into()),
        ]));
        assert_eq!(row, vec![0.0, 2.0]);
        assert_eq!(row.len(), dv.n_features());
    }

    #[test]
    fn test_missing_feature_stays_zero() {
        let mut dv = DictVectorizer::new();
        dv.fit(&[rec(&[("a", 1.0.into()), ("b", 1.0.into())])]);
        assert_eq!(dv.transform_one(&rec(&[("b", 4.0.into())])), vec![0.0, 4.0]);
    }

    #[test]
    fn test_empty_corpus_gives_empty_vocabulary() {
        let mut dv = DictVectorizer::new();
        dv.fit(&[]);
        assert_eq!(dv.n_features(), 0);
        assert!(dv.transform_one(&rec(&[("a", 1.0.into())])).is_empty());
    }
}
