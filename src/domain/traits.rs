// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the pipelines and the models behind them.
//
//   - BlenderBotChat implements Responder
//   - WatsonxClient  implements TextGenerator
//
// The application layer only sees the trait, so the chat loop
// can be driven by a scripted responder in tests and the real
// model in production without any change.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

// ─── Responder ────────────────────────────────────────────────────────────────
/// Anything that can produce the next reply of a dialogue.
pub trait Responder {
    /// `context` is the flattened history of earlier turns
    /// (possibly empty), `input` the new user line.
    fn respond(&mut self, context: &str, input: &str) -> Result<String>;
}

// ─── TextGenerator ────────────────────────────────────────────────────────────
/// Any component that turns a single prompt into generated text.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}
