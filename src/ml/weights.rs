// ============================================================
// Layer 5 — Pretrained Weight Loading (candle)
// ============================================================
// Builds a candle VarBuilder over a hub repo's checkpoint.
// safetensors is memory-mapped when the repo ships it; older
// repos only carry pytorch_model.bin, which is read whole.

use anyhow::{Context, Result};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;

use crate::infra::hub::HubStore;

pub const WEIGHT_FILES: [&str; 2] = ["model.safetensors", "pytorch_model.bin"];

pub fn load_var_builder(store: &HubStore, device: &Device) -> Result<VarBuilder<'static>> {
    let (name, path) = store.first_available(&WEIGHT_FILES)?;
    tracing::info!("Loading {} weights from {}", store.model_id(), name);

    if name.ends_with(".safetensors") {
        // SAFETY: the file sits in the hub cache and is not modified
        // while the model is alive.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&path], DType::F32, device) }
            .with_context(|| format!("Cannot map '{}'", path.display()))?;
        Ok(vb)
    } else {
        VarBuilder::from_pth(&path, DType::F32, device)
            .with_context(|| format!("Cannot read '{}'", path.display()))
    }
}
