// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// All tensor code lives here. Two frameworks, one per job:
//
//   burn   — the two models trained from scratch
//
//     classifier.rs — CNN for 28×28 digits, cross-entropy loss
//     regressor.rs  — MLP for housing prices, MSE loss
//     trainer.rs    — generic fit/evaluate loop over a
//                     `Supervised` step, per-epoch history
//     backend.rs    — runtime choice between NdArray and Wgpu
//
//   candle — pretrained Hugging Face checkpoints, inference only
//
//     blenderbot.rs — encoder–decoder chat network
//     decoding.rs   — beam search with n-gram blocking and
//                     length penalty (tensor-free)
//     chatbot.rs    — tokenizer + network + beam search as a
//                     `Responder`
//     captioner.rs  — BLIP image preprocessing and greedy
//                     caption decoding
//     weights.rs    — safetensors / pytorch_model.bin loading
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Digit classification CNN
pub mod classifier;

/// Housing price regression MLP
pub mod regressor;

/// Training loop with per-epoch validation
pub mod trainer;

/// Burn backend selection
pub mod backend;

/// BlenderBot network on candle
pub mod blenderbot;

/// Beam search decoding
pub mod decoding;

/// Local chat model behind the Responder trait
pub mod chatbot;

/// BLIP image captioning
pub mod captioner;

/// Pretrained checkpoint loading
pub mod weights;
