// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits shared by the pipelines.
//
// Rules for this layer:
//   - NO burn or candle types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Append-only dialogue history
pub mod conversation;

// Per-epoch losses and metrics of a training run
pub mod training_history;

// Core abstractions (traits) that other layers implement
pub mod traits;
