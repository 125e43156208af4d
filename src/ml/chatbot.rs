// ============================================================
// Layer 5 — Local Chat Model
// ============================================================
// Wires the hub files, the tokenizer, the BlenderBot network and
// beam search into a `Responder`:
//
//   (context, input)
//     → tokenizer pair encoding (post-processor adds </s>)
//     → keep the LAST max_position_embeddings tokens
//     → encoder once
//     → beam search, decoder re-run per step on all beams
//     → decode, skipping special tokens, trimmed
//
// Truncation only shapes what the encoder sees; the dialogue
// history itself is never cut.

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use crate::domain::traits::Responder;
use crate::infra::hub::HubStore;
use crate::ml::blenderbot::{BlenderbotConfig, BlenderbotModel};
use crate::ml::decoding::{beam_search, log_softmax, DecodingConfig};
use crate::ml::weights::load_var_builder;

pub const CHAT_MODEL_ID: &str = "facebook/blenderbot-400M-distill";

pub struct BlenderBotChat {
    model:         BlenderbotModel,
    tokenizer:     Tokenizer,
    decoding:      DecodingConfig,
    max_input_len: usize,
}

impl BlenderBotChat {
    /// Download (or reuse from cache) and load `model_id`
    pub fn load(model_id: &str, revision: &str, device: &Device) -> Result<Self> {
        let store = HubStore::new(model_id, revision)?;

        let config_path = store.get("config.json")?;
        let config: BlenderbotConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("Cannot read '{}'", config_path.display()))?,
        )
        .with_context(|| format!("Invalid model config '{}'", config_path.display()))?;

        let mut tokenizer = store.tokenizer()?;
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow::anyhow!("Cannot disable tokenizer truncation: {}", e))?;
        tokenizer.with_padding(None);

        let vb = load_var_builder(&store, device)?;
        let model = BlenderbotModel::new(&config, vb)
            .with_context(|| format!("Cannot build model from '{}' weights", model_id))?;

        tracing::info!(
            "Loaded {} ({} encoder / {} decoder layers, d_model={})",
            model_id, config.encoder_layers, config.decoder_layers, config.d_model
        );

        Ok(Self {
            model,
            tokenizer,
            decoding: config.decoding(),
            max_input_len: config.max_position_embeddings,
        })
    }

    /// Token ids for the encoder: the (context, input) pair, most recent
    /// `max_input_len` tokens kept.
    pub fn encode_input(&self, context: &str, input: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode((context, input), true)
            .map_err(|e| anyhow::anyhow!("Tokenisation failed: {}", e))?;
        Ok(keep_last(encoding.get_ids(), self.max_input_len))
    }

    fn generate(&self, input_ids: &[u32]) -> Result<Vec<u32>> {
        let device = self.model.device();
        let input = Tensor::new(input_ids, device)?.unsqueeze(0)?;
        let encoder_out = self.model.encode(&input)?;

        beam_search(&self.decoding, |beams| {
            let len = beams.first().map(Vec::len).unwrap_or(0);
            let flat: Vec<u32> = beams.iter().flatten().copied().collect();
            let ids = Tensor::from_vec(flat, (beams.len(), len), device)?;
            let logits = self.model.next_token_logits(&ids, &encoder_out)?;
            Ok(logits.to_vec2::<f32>()?.iter().map(|row| log_softmax(row)).collect())
        })
    }
}

impl Responder for BlenderBotChat {
    fn respond(&mut self, context: &str, input: &str) -> Result<String> {
        let input_ids = self.encode_input(context, input)?;
        tracing::debug!("Encoder input: {} tokens", input_ids.len());

        let reply_ids = self.generate(&input_ids)?;
        let reply = self
            .tokenizer
            .decode(&reply_ids, true)
            .map_err(|e| anyhow::anyhow!("Cannot decode reply: {}", e))?;
        Ok(reply.trim().to_string())
    }
}

/// The last `max` ids (all of them when shorter)
fn keep_last(ids: &[u32], max: usize) -> Vec<u32> {
    ids[ids.len().saturating_sub(max)..].to_vec()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_last_truncates_from_the_left() {
        let ids: Vec<u32> = (0..10).collect();
        assert_eq!(keep_last(&ids, 4), vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_keep_last_short_input_untouched() {
        assert_eq!(keep_last(&[5, 2], 128), vec![5, 2]);
        assert!(keep_last(&[], 128).is_empty());
    }
}
