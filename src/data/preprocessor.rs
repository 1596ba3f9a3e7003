// ============================================================
// Layer 4 — Record Preprocessor
// ============================================================
// Turns raw abalone measurements into a FeatureRecord.
//
// Steps (applied to every record, training and serving alike):
//   1. One-hot encode Sex against the fixed categories F, I, M,
//      dropping the first (F) so it becomes the baseline:
//        F → Sex_I=0, Sex_M=0
//        I → Sex_I=1, Sex_M=0
//        M → Sex_I=0, Sex_M=1
//   2. Drop the Length column
//   3. Keep the remaining measurements under their CSV names
//
// The request path never sees Length, so both AbaloneRecord and
// AbaloneInput go through the same function and produce the
// same feature names.

use crate::domain::abalone::{AbaloneInput, AbaloneRecord, Sex};
use crate::domain::features::{FeatureRecord, FeatureValue};

/// Category order used for one-hot encoding; the first is dropped
const SEX_CATEGORIES: [Sex; 3] = [Sex::F, Sex::I, Sex::M];

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Feature record for a request (no Length, no target)
    pub fn process(&self, input: &AbaloneInput) -> FeatureRecord {
        let mut features = FeatureRecord::new();

        // ── Step 1: Sex dummies ───────────────────────────────────────────────
        for category in SEX_CATEGORIES.iter().skip(1) {
            let hot = if input.sex == *category { 1.0 } else { 0.0 };
            features.insert(format!("Sex_{}", category.code()), FeatureValue::Number(hot));
        }

        // ── Step 2/3: Measurements (Length already absent) ───────────────────
        let measurements = [
            ("Diameter",       input.diameter),
            ("Height",         input.height),
            ("Whole weight",   input.whole_weight),
            ("Shucked weight", input.shucked_weight),
            ("Viscera weight", input.viscera_weight),
            ("Shell weight",   input.shell_weight),
        ];
        for (name, value) in measurements {
            features.insert(name.to_string(), FeatureValue::Number(value));
        }

        features
    }

    /// Feature record and target for one labelled CSV row.
    /// Length is dropped here.
    pub fn process_record(&self, record: &AbaloneRecord) -> (FeatureRecord, f64) {
        (self.process(&AbaloneInput::from(record)), record.rings)
    }

    /// Process a whole dataset into parallel feature / target vectors
    pub fn process_all(&self, records: &[AbaloneRecord]) -> (Vec<FeatureRecord>, Vec<f64>) {
        records.iter().map(|r| self.process_record(r)).unzip()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
