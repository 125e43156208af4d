// ============================================================
// Layer 5 — BlenderBot Encoder–Decoder (candle)
// ============================================================
// Inference-only port of the blenderbot-400M-distill network:
//
//   input ids ─► shared embedding × sqrt(d_model) + learned positions
//              ─► N × encoder layer ─► LayerNorm ─► encoder states
//
//   decoder ids ─► shared embedding × sqrt(d_model) + learned positions
//               ─► M × decoder layer (causal self-attn, cross-attn)
//               ─► LayerNorm ─► tied LM head + final_logits_bias
//
// Every layer is PRE-norm:
//   h = h + Attn(LN(h));  h = h + FFN(LN(h))
// Positions start at 0 (no offset), activation is exact GELU.
//
// The decoder recomputes the whole prefix every step instead of
// keeping a KV cache; replies are at most 60 tokens.
//
// Weight names follow the published checkpoint:
//   model.shared.weight
//   model.{encoder,decoder}.embed_positions.weight
//   model.{encoder,decoder}.layers.{i}.{self_attn,encoder_attn}.{q,k,v,out}_proj
//   model.{encoder,decoder}.layers.{i}.{self_attn_layer_norm,encoder_attn_layer_norm,final_layer_norm}
//   model.{encoder,decoder}.layers.{i}.{fc1,fc2}
//   model.{encoder,decoder}.layer_norm
//   final_logits_bias
//
// Reference: Roller et al. (2020) Recipes for building an open-domain chatbot

use candle_core::{DType, Device, IndexOp, Module, Result, Tensor};
use candle_nn::{embedding, layer_norm, linear, Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;

use crate::ml::decoding::DecodingConfig;

const LAYER_NORM_EPS: f64 = 1e-5;

// ─── Config ───────────────────────────────────────────────────────────────────
/// The subset of `config.json` the network and its generator need
#[derive(Debug, Clone, Deserialize)]
pub struct BlenderbotConfig {
    pub vocab_size:              usize,
    pub d_model:                 usize,
    pub encoder_layers:          usize,
    pub decoder_layers:          usize,
    pub encoder_attention_heads: usize,
    pub decoder_attention_heads: usize,
    pub encoder_ffn_dim:         usize,
    pub decoder_ffn_dim:         usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_true")]
    pub scale_embedding:         bool,
    #[serde(default = "default_eos")]
    pub eos_token_id:            u32,
    #[serde(default = "default_decoder_start")]
    pub decoder_start_token_id:  u32,

    // Generation defaults shipped inside config.json
    #[serde(default = "default_num_beams")]
    pub num_beams:               usize,
    #[serde(default = "default_min_length")]
    pub min_length:              usize,
    #[serde(default = "default_max_length")]
    pub max_length:              usize,
    #[serde(default = "default_no_repeat_ngram")]
    pub no_repeat_ngram_size:    usize,
    #[serde(default = "default_length_penalty")]
    pub length_penalty:          f64,
}

fn default_true() -> bool { true }
fn default_eos() -> u32 { 2 }
fn default_decoder_start() -> u32 { 1 }
fn default_num_beams() -> usize { 10 }
fn default_min_length() -> usize { 20 }
fn default_max_length() -> usize { 60 }
fn default_no_repeat_ngram() -> usize { 3 }
fn default_length_penalty() -> f64 { 0.65 }

impl BlenderbotConfig {
    pub fn decoding(&self) -> DecodingConfig {
        DecodingConfig {
            num_beams:              self.num_beams,
            min_length:             self.min_length,
            max_length:             self.max_length,
            no_repeat_ngram_size:   self.no_repeat_ngram_size,
            length_penalty:         self.length_penalty,
            decoder_start_token_id: self.decoder_start_token_id,
            eos_token_id:           self.eos_token_id,
        }
    }

    fn embed_scale(&self) -> f64 {
        if self.scale_embedding { (self.d_model as f64).sqrt() } else { 1.0 }
    }
}

// ─── Attention ────────────────────────────────────────────────────────────────
struct Attention {
    q_proj:    Linear,
    k_proj:    Linear,
    v_proj:    Linear,
    out_proj:  Linear,
    num_heads: usize,
    head_dim:  usize,
    scaling:   f64,
}

impl Attention {
    fn new(d_model: usize, num_heads: usize, vb: VarBuilder) -> Result<Self> {
        let head_dim = d_model / num_heads;
        Ok(Self {
            q_proj:   linear(d_model, d_model, vb.pp("q_proj"))?,
            k_proj:   linear(d_model, d_model, vb.pp("k_proj"))?,
            v_proj:   linear(d_model, d_model, vb.pp("v_proj"))?,
            out_proj: linear(d_model, d_model, vb.pp("out_proj"))?,
            num_heads,
            head_dim,
            scaling: (head_dim as f64).powf(-0.5),
        })
    }

    /// [b, len, d] → [b, heads, len, head_dim]
    fn split_heads(&self, xs: &Tensor) -> Result<Tensor> {
        let (b, len, _) = xs.dims3()?;
        xs.reshape((b, len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    /// Self-attention when `key_value` is None, cross-attention otherwise.
    fn forward(&self, xs: &Tensor, key_value: Option<&Tensor>, mask: Option<&Tensor>) -> Result<Tensor> {
        let (b, t, _) = xs.dims3()?;
        let kv = key_value.unwrap_or(xs);

        let q = self.split_heads(&(self.q_proj.forward(xs)? * self.scaling)?)?;
        let k = self.split_heads(&self.k_proj.forward(kv)?)?;
        let v = self.split_heads(&self.v_proj.forward(kv)?)?;

        // [b, h, t, s]
        let scores = q.matmul(&k.t()?)?;
        let scores = match mask {
            Some(m) => scores.broadcast_add(m)?,
            None    => scores,
        };
        let weights = candle_nn::ops::softmax_last_dim(&scores)?;

        let out = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((b, t, self.num_heads * self.head_dim))?;
        self.out_proj.forward(&out)
    }
}

// ─── Feed-forward ─────────────────────────────────────────────────────────────
struct FeedForward {
    fc1: Linear,
    fc2: Linear,
}

impl FeedForward {
    fn new(d_model: usize, ffn_dim: usize, vb: &VarBuilder) -> Result<Self> {
        Ok(Self {
            fc1: linear(d_model, ffn_dim, vb.pp("fc1"))?,
            fc2: linear(ffn_dim, d_model, vb.pp("fc2"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.fc2.forward(&self.fc1.forward(xs)?.gelu_erf()?)
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
struct EncoderLayer {
    self_attn:            Attention,
    self_attn_layer_norm: LayerNorm,
    ffn:                  FeedForward,
    final_layer_norm:     LayerNorm,
}

impl EncoderLayer {
    fn new(cfg: &BlenderbotConfig, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            self_attn:            Attention::new(cfg.d_model, cfg.encoder_attention_heads, vb.pp("self_attn"))?,
            self_attn_layer_norm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("self_attn_layer_norm"))?,
            ffn:                  FeedForward::new(cfg.d_model, cfg.encoder_ffn_dim, &vb)?,
            final_layer_norm:     layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("final_layer_norm"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let h = self.self_attn.forward(&self.self_attn_layer_norm.forward(xs)?, None, None)?;
        let xs = (xs + h)?;
        let h = self.ffn.forward(&self.final_layer_norm.forward(&xs)?)?;
        xs + h
    }
}

struct Encoder {
    embed_positions: Embedding,
    layers:          Vec<EncoderLayer>,
    layer_norm:      LayerNorm,
}

impl Encoder {
    fn new(cfg: &BlenderbotConfig, vb: VarBuilder) -> Result<Self> {
        let layers = (0..cfg.encoder_layers)
            .map(|i| EncoderLayer::new(cfg, vb.pp(format!("layers.{i}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            embed_positions: embedding(cfg.max_position_embeddings, cfg.d_model, vb.pp("embed_positions"))?,
            layers,
            layer_norm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("layer_norm"))?,
        })
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────
struct DecoderLayer {
    self_attn:               Attention,
    self_attn_layer_norm:    LayerNorm,
    encoder_attn:            Attention,
    encoder_attn_layer_norm: LayerNorm,
    ffn:                     FeedForward,
    final_layer_norm:        LayerNorm,
}

impl DecoderLayer {
    fn new(cfg: &BlenderbotConfig, vb: VarBuilder) -> Result<Self> {
        let heads = cfg.decoder_attention_heads;
        Ok(Self {
            self_attn:               Attention::new(cfg.d_model, heads, vb.pp("self_attn"))?,
            self_attn_layer_norm:    layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("self_attn_layer_norm"))?,
            encoder_attn:            Attention::new(cfg.d_model, heads, vb.pp("encoder_attn"))?,
            encoder_attn_layer_norm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("encoder_attn_layer_norm"))?,
            ffn:                     FeedForward::new(cfg.d_model, cfg.decoder_ffn_dim, &vb)?,
            final_layer_norm:        layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("final_layer_norm"))?,
        })
    }

    fn forward(&self, xs: &Tensor, encoder_out: &Tensor, causal: &Tensor) -> Result<Tensor> {
        let h = self.self_attn.forward(&self.self_attn_layer_norm.forward(xs)?, None, Some(causal))?;
        let xs = (xs + h)?;
        let h = self.encoder_attn.forward(&self.encoder_attn_layer_norm.forward(&xs)?, Some(encoder_out), None)?;
        let xs = (xs + h)?;
        let h = self.ffn.forward(&self.final_layer_norm.forward(&xs)?)?;
        xs + h
    }
}

struct Decoder {
    embed_positions: Embedding,
    layers:          Vec<DecoderLayer>,
    layer_norm:      LayerNorm,
}

impl Decoder {
    fn new(cfg: &BlenderbotConfig, vb: VarBuilder) -> Result<Self> {
        let layers = (0..cfg.decoder_layers)
            .map(|i| DecoderLayer::new(cfg, vb.pp(format!("layers.{i}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            embed_positions: embedding(cfg.max_position_embeddings, cfg.d_model, vb.pp("embed_positions"))?,
            layers,
            layer_norm: layer_norm(cfg.d_model, LAYER_NORM_EPS, vb.pp("layer_norm"))?,
        })
    }
}

/// [len, len] additive mask: 0 on and below the diagonal, −∞ above
pub fn causal_mask(len: usize, device: &Device) -> Result<Tensor> {
    let mask: Vec<f32> = (0..len)
        .flat_map(|i| (0..len).map(move |j| if j > i { f32::NEG_INFINITY } else { 0.0 }))
        .collect();
    Tensor::from_vec(mask, (len, len), device)
}

// ─── Full model ───────────────────────────────────────────────────────────────
pub struct BlenderbotModel {
    shared:            Embedding,
    encoder:           Encoder,
    decoder:           Decoder,
    final_logits_bias: Tensor,
    embed_scale:       f64,
    device:            Device,
}

impl BlenderbotModel {
    pub fn new(cfg: &BlenderbotConfig, vb: VarBuilder) -> Result<Self> {
        let model = vb.pp("model");
        let final_logits_bias = vb
            .get((1, cfg.vocab_size), "final_logits_bias")
            .or_else(|_| Tensor::zeros((1, cfg.vocab_size), DType::F32, vb.device()))?;

        Ok(Self {
            shared:  embedding(cfg.vocab_size, cfg.d_model, model.pp("shared"))?,
            encoder: Encoder::new(cfg, model.pp("encoder"))?,
            decoder: Decoder::new(cfg, model.pp("decoder"))?,
            final_logits_bias,
            embed_scale: cfg.embed_scale(),
            device: vb.device().clone(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// token ids + scaled embeddings + learned positions: [b, len] → [b, len, d]
    fn embed(&self, ids: &Tensor, positions: &Embedding) -> Result<Tensor> {
        let (_, len) = ids.dims2()?;
        let tokens = (self.shared.forward(ids)? * self.embed_scale)?;
        let pos_ids = Tensor::arange(0u32, len as u32, &self.device)?;
        tokens.broadcast_add(&positions.forward(&pos_ids)?)
    }

    /// input_ids: [1, src_len] → encoder states [1, src_len, d_model]
    pub fn encode(&self, input_ids: &Tensor) -> Result<Tensor> {
        let mut xs = self.embed(input_ids, &self.encoder.embed_positions)?;
        for layer in &self.encoder.layers {
            xs = layer.forward(&xs)?;
        }
        self.encoder.layer_norm.forward(&xs)
    }

    /// decoder_ids: [beams, tgt_len], encoder_out: [1, src_len, d]
    /// → logits of the token after the last position: [beams, vocab]
    pub fn next_token_logits(&self, decoder_ids: &Tensor, encoder_out: &Tensor) -> Result<Tensor> {
        let (beams, len) = decoder_ids.dims2()?;
        let (_, src_len, d_model) = encoder_out.dims3()?;
        let encoder_out = encoder_out.broadcast_as((beams, src_len, d_model))?.contiguous()?;
        let causal = causal_mask(len, &self.device)?;

        let mut xs = self.embed(decoder_ids, &self.decoder.embed_positions)?;
        for layer in &self.decoder.layers {
            xs = layer.forward(&xs, &encoder_out, &causal)?;
        }
        let xs = self.decoder.layer_norm.forward(&xs)?;

        let last = xs.i((.., len - 1, ..))?.contiguous()?;
        last.matmul(&self.shared.embeddings().t()?)?
            .broadcast_add(&self.final_logits_bias)
    }
}
