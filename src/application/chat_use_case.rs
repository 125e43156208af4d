// ============================================================
// Layer 2 — ChatUseCase
// ============================================================
// Interactive dialogue with the local chat model.
//
// Each turn:
//   1. flatten the history so far into one context string
//   2. ask the responder for a reply to (context, input)
//   3. append the user line, then the reply
//
// The history is never trimmed; after N exchanges it holds 2N
// turns, user first. The loop reads one line per turn and ends
// at end of input.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::domain::conversation::ConversationHistory;
use crate::domain::traits::Responder;
use crate::ml::chatbot::{BlenderBotChat, CHAT_MODEL_ID};

pub const PROMPT: &str = "You: ";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub model_id: String,
    pub revision: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { model_id: CHAT_MODEL_ID.to_string(), revision: "main".to_string() }
    }
}

// ─── ChatSession ──────────────────────────────────────────────────────────────
pub struct ChatSession<R: Responder> {
    responder: R,
    history:   ConversationHistory,
}

impl<R: Responder> ChatSession<R> {
    pub fn new(responder: R) -> Self {
        Self { responder, history: ConversationHistory::new() }
    }

    /// One exchange: reply to `input` given everything said before it.
    pub fn turn(&mut self, input: &str) -> Result<String> {
        let context = self.history.context();
        let reply = self.responder.respond(&context, input)?;

        self.history.push_user(input);
        self.history.push_model(reply.clone());
        tracing::debug!("Exchange {} complete", self.history.exchanges());
        Ok(reply)
    }

    /// Prompt, read a line, print the reply; until `input` is exhausted.
    pub fn run_loop<I: BufRead, W: Write>(&mut self, mut input: I, mut out: W) -> Result<()> {
        let mut line = String::new();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line).context("Cannot read from input")? == 0 {
                writeln!(out)?;
                break;
            }
            let text = line.trim_end_matches(['\n', '\r']);

            let reply = self.turn(text)?;
            writeln!(out, "{reply}")?;
        }
        tracing::info!("Conversation ended after {} exchanges", self.history.exchanges());
        Ok(())
    }
}

// ─── ChatUseCase ──────────────────────────────────────────────────────────────
pub struct ChatUseCase {
    config: ChatConfig,
}

impl ChatUseCase {
    pub fn new(config: ChatConfig) -> Self {
        Self { config }
    }

    /// Load the model, then chat over stdin/stdout
    pub fn execute(&self) -> Result<()> {
        let device = candle_core::Device::Cpu;
        tracing::info!("Loading chat model '{}'", self.config.model_id);
        let bot = BlenderBotChat::load(&self.config.model_id, &self.config.revision, &device)?;

        let mut session = ChatSession::new(bot);
        let stdin = std::io::stdin();
        session.run_loop(stdin.lock(), std::io::stdout())
    }
}
