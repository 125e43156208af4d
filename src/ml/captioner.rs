// ============================================================
// Layer 5 — Image Captioner (BLIP, candle)
// ============================================================
// Conditional captioning with a pretrained BLIP checkpoint:
//
//   image ─► RGB ─► 384×384 ─► /255 ─► CLIP mean/std ─► [3, 384, 384]
//         ─► vision transformer (once) ─► image embeddings
//
//   [BOS] + prompt tokens ─► text decoder (KV cached)
//         ─► greedy argmax until [SEP] or max_length tokens
//
// The caption keeps the prompt ("the image of …"), the way the
// model was trained to continue it.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_transformers::models::blip::{BlipForConditionalGeneration, Config};
use image::{imageops::FilterType, DynamicImage};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::infra::hub::HubStore;
use crate::ml::decoding::greedy_decode;
use crate::ml::weights::load_var_builder;

pub const CAPTION_MODEL_ID: &str = "Salesforce/blip-image-captioning-base";
pub const IMAGE_SIZE:   usize = 384;
pub const BOS_TOKEN_ID: u32   = 30522;
pub const SEP_TOKEN_ID: u32   = 102;

const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD:  [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// BLIP-base sizes: ViT-B/16 vision tower, BERT-base text decoder
pub fn base_config() -> Config {
    let mut cfg = Config::image_captioning_large();
    cfg.vision_config.hidden_size         = 768;
    cfg.vision_config.intermediate_size   = 3072;
    cfg.vision_config.num_hidden_layers   = 12;
    cfg.vision_config.num_attention_heads = 12;
    cfg.text_config.encoder_hidden_size   = 768;
    cfg
}

/// Open any image format the `image` crate decodes
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::ImageReader::open(path)
        .with_context(|| format!("Cannot open image '{}'", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Cannot detect format of '{}'", path.display()))?
        .decode()
        .with_context(|| format!("Cannot decode image '{}'", path.display()))
}

/// RGB, resized and normalised: [3, IMAGE_SIZE, IMAGE_SIZE] f32
pub fn preprocess(img: &DynamicImage, device: &Device) -> Result<Tensor> {
    let rgb = img
        .resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::CatmullRom)
        .to_rgb8();

    let mean = Tensor::new(&CLIP_MEAN, device)?.reshape((3, 1, 1))?;
    let std  = Tensor::new(&CLIP_STD, device)?.reshape((3, 1, 1))?;

    let pixels = Tensor::from_vec(rgb.into_raw(), (IMAGE_SIZE, IMAGE_SIZE, 3), device)?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?;
    let pixels = (pixels / 255.0)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?;
    Ok(pixels)
}

pub struct BlipCaptioner {
    model:     BlipForConditionalGeneration,
    tokenizer: Tokenizer,
    device:    Device,
}

impl BlipCaptioner {
    pub fn load(model_id: &str, revision: &str, device: &Device) -> Result<Self> {
        let store = HubStore::new(model_id, revision)?;

        let config = match store.get_optional("config.json") {
            Some(path) => std::fs::read_to_string(&path)
                .ok()
                .and_then(|raw| serde_json::from_str::<Config>(&raw).ok())
                .unwrap_or_else(|| {
                    tracing::debug!("Using built-in BLIP-base config for {}", model_id);
                    base_config()
                }),
            None => base_config(),
        };

        let tokenizer = store.tokenizer()?;
        let vb = load_var_builder(&store, device)?;
        let model = BlipForConditionalGeneration::new(&config, vb)
            .with_context(|| format!("Cannot build BLIP from '{}' weights", model_id))?;

        Ok(Self { model, tokenizer, device: device.clone() })
    }

    /// Caption `image`, continuing `prompt`, at most `max_length` tokens
    /// including [BOS] and the prompt.
    pub fn caption(&mut self, image: &DynamicImage, prompt: &str, max_length: usize) -> Result<String> {
        let pixels = preprocess(image, &self.device)?.unsqueeze(0)?;
        let image_embeds = self.model.vision_model().forward(&pixels)?;

        let prompt_ids = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation failed: {}", e))?;
        let seed = seed_tokens(prompt_ids.get_ids());

        self.model.reset_kv_cache();
        let (model, device) = (&mut self.model, &self.device);
        let token_ids = greedy_decode(seed, max_length, SEP_TOKEN_ID, |input| {
            let input  = Tensor::new(input, device)?.unsqueeze(0)?;
            let logits = model.text_decoder().forward(&input, &image_embeds)?;
            let last   = logits.squeeze(0)?;
            let last   = last.get(last.dim(0)? - 1)?;
            Ok(last.argmax(D::Minus1)?.to_scalar::<u32>()?)
        })?;
        tracing::debug!("Generated {} caption tokens", token_ids.len());

        let caption = self
            .tokenizer
            .decode(&token_ids, true)
            .map_err(|e| anyhow::anyhow!("Cannot decode caption: {}", e))?;
        Ok(caption.trim().to_string())
    }
}

/// [BOS] followed by the prompt ids
fn seed_tokens(prompt_ids: &[u32]) -> Vec<u32> {
    std::iter::once(BOS_TOKEN_ID).chain(prompt_ids.iter().copied()).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_preprocess_shape_and_normalisation() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([255, 255, 255])));
        let t = preprocess(&white, &Device::Cpu).unwrap();
        assert_eq!(t.dims(), &[3, IMAGE_SIZE, IMAGE_SIZE]);

        let values = t.to_vec3::<f32>().unwrap();
        for c in 0..3 {
            let expected = (1.0 - CLIP_MEAN[c]) / CLIP_STD[c];
            assert!((values[c][0][0] - expected).abs() < 1e-4);
            assert!((values[c][IMAGE_SIZE - 1][IMAGE_SIZE - 1] - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_grayscale_input_becomes_three_channels() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(8, 8, image::Luma([0])));
        let t = preprocess(&gray, &Device::Cpu).unwrap();
        assert_eq!(t.dims()[0], 3);
    }

    #[test]
    fn test_seed_starts_with_bos() {
        assert_eq!(seed_tokens(&[1996, 3746, 1997]), vec![BOS_TOKEN_ID, 1996, 3746, 1997]);
        assert_eq!(seed_tokens(&[]), vec![BOS_TOKEN_ID]);
    }

    #[test]
    fn test_base_config_sizes() {
        let cfg = base_config();
        assert_eq!(cfg.vision_config.hidden_size, 768);
        assert_eq!(cfg.vision_config.num_hidden_layers, 12);
        assert_eq!(cfg.text_config.encoder_hidden_size, 768);
    }
}
