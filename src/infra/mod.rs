// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   persist.rs        — atomic object persistence: temp file in
//                       the destination directory, then rename
//
//   artifact_store.rs — where the serving artifacts live
//                       (model.bin, encoder.bin, train_config.json)
//
//   tracker.rs        — local experiment tracking: runs, tags,
//                       params, metrics CSV, model registry
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling)

/// Atomic write / read of serialized artifacts
pub mod persist;

/// Serving artifact layout
pub mod artifact_store;

/// Runs, metrics and model registry
pub mod tracker;
