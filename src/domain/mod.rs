// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums, and traits that name the core
// concepts of the system. No file I/O, no HTTP, no model code.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Raw rows, prediction requests and responses
pub mod abalone;

// Named attribute records fed to the vectorizer
pub mod features;

// Core abstractions (traits) that other layers implement
pub mod traits;
