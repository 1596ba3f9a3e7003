// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each.
// No model math, no printing, no HTTP here: only workflow
// coordination.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training flow (load → preprocess → split → encode → fit → evaluate → persist)
pub mod train_use_case;

// Loaded model + encoder shared by the CLI and the HTTP service
pub mod predict_use_case;

// Interval-driven retraining
pub mod schedule_use_case;
