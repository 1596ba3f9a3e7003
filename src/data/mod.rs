// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw CSV to dense feature vectors.
//
//   abalone.csv
//       │
//       ▼
//   CsvLoader         → reads rows into AbaloneRecord
//       │
//       ▼
//   Preprocessor      → one-hot Sex, drop Length, split off Rings
//       │
//       ▼
//   split_train_test  → seeded 80/20 shuffle split
//       │
//       ▼
//   DictVectorizer    → FeatureRecord → fixed-order Vec<f64>
//
// Reference: csv crate documentation
//            Rust Book §13 (Iterators and Closures)

/// Loads the abalone CSV using the csv crate
pub mod loader;

/// One-hot encoding and column selection
pub mod preprocessor;

/// Seeded shuffle and train/test split
pub mod splitter;

/// Vocabulary-based feature encoder
pub mod vectorizer;
