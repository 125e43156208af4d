// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the outside world:
//
//   watsonx.rs   — HTTPS client for the hosted text-generation
//                  endpoint (IAM token exchange + generation)
//
//   hub.rs       — Hugging Face hub access for pretrained model
//                  configs, tokenizers and weights
//
//   download.rs  — cached HTTPS downloads for datasets
//
//   artifacts.rs — per-run output directory and run_config.json
//
//   metrics.rs   — per-epoch CSV metrics log
//
//   plots.rs     — SVG learning curves and prediction grids
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// watsonx.ai text-generation client
pub mod watsonx;

/// Pretrained model file store
pub mod hub;

/// Cached dataset downloads
pub mod download;

/// Training run output directory
pub mod artifacts;

/// Training metrics CSV logger
pub mod metrics;

/// Learning-curve and prediction plots
pub mod plots;
