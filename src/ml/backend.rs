// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// The training pipelines are generic over a burn backend; the
// concrete one is picked at runtime from the CLI:
//
//   --backend wgpu     Autodiff<Wgpu>     (GPU, default)
//   --backend ndarray  Autodiff<NdArray>  (CPU, always works)
//
// Validation and evaluation run on the matching inner backend,
// which `model.valid()` hands back automatically.

use burn::backend::{Autodiff, NdArray, Wgpu};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub type CpuBackend      = NdArray<f32>;
pub type CpuTrainBackend = Autodiff<CpuBackend>;
pub type GpuBackend      = Wgpu;
pub type GpuTrainBackend = Autodiff<GpuBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// CPU backend using ndarray
    #[value(name = "ndarray")]
    NdArray,

    /// GPU backend using WGPU
    #[default]
    #[value(name = "wgpu")]
    Wgpu,
}

impl BackendType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NdArray => "ndarray",
            Self::Wgpu    => "wgpu",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
