// ============================================================
// Layer 2 — CaptionUseCase
// ============================================================
//   Step 1: Decode the image            (Layer 5 - ml)
//   Step 2: Load the pretrained BLIP    (Layer 6 - infra, Layer 5 - ml)
//   Step 3: Caption, continuing the prompt

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ml::captioner::{load_image, BlipCaptioner, CAPTION_MODEL_ID};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    pub image_path: PathBuf,
    pub prompt:     String,
    pub max_length: usize,
    pub model_id:   String,
    pub revision:   String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("google.png"),
            prompt:     "the image of".to_string(),
            max_length: 50,
            model_id:   CAPTION_MODEL_ID.to_string(),
            revision:   "main".to_string(),
        }
    }
}

pub struct CaptionUseCase {
    config: CaptionConfig,
}

impl CaptionUseCase {
    pub fn new(config: CaptionConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<String> {
        let cfg = &self.config;

        // Fail on a bad path before downloading any weights
        let image = load_image(&cfg.image_path)?;
        tracing::info!(
            "Captioning '{}' ({}×{})",
            cfg.image_path.display(), image.width(), image.height()
        );

        let device = candle_core::Device::Cpu;
        let mut captioner = BlipCaptioner::load(&cfg.model_id, &cfg.revision, &device)?;
        captioner.caption(&image, &cfg.prompt, cfg.max_length)
    }
}
