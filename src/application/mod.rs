// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per CLI command. Each one orchestrates the other
// layers to run a single pipeline end to end.
//
// Rules for this layer:
//   - No model or tensor math here
//   - No argument parsing or result printing (that's Layer 1)
//   - No direct network or file format code (Layers 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Hosted text generation
pub mod generate_use_case;

// Interactive chat with the local model
pub mod chat_use_case;

// Image captioning
pub mod caption_use_case;

// Digit classification training
pub mod classification_use_case;

// Housing price regression training
pub mod regression_use_case;
