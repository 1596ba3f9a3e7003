// ============================================================
// Layer 3 — Feature Records
// ============================================================
// A FeatureRecord is the hand-off format between preprocessing
// and the vectorizer: named attributes, each either a number or
// a category label. BTreeMap keeps iteration order stable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single named attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Category(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Category(v)
    }
}

/// Field name → value, ordered by field name
pub type FeatureRecord = BTreeMap<String, FeatureValue>;
